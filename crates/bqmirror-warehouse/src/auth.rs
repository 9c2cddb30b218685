//! Bearer-token sources for the BigQuery REST client.

use std::sync::Arc;

use async_trait::async_trait;
use bqmirror_types::WarehouseError;

const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

/// Supplies an OAuth2 access token for each API request.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`WarehouseError`] when no token can be obtained.
    async fn access_token(&self) -> Result<String, WarehouseError>;
}

/// Application-default credentials discovered by `gcp_auth`.
pub struct GcpTokenSource {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl std::fmt::Debug for GcpTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpTokenSource")
            .field("provider", &"<TokenProvider>")
            .finish()
    }
}

impl GcpTokenSource {
    /// Discover credentials from the environment (service account key,
    /// gcloud user credentials, or the metadata server).
    ///
    /// # Errors
    ///
    /// Returns a `PERMISSION_DENIED` error when no credentials are available.
    pub async fn discover() -> Result<Self, WarehouseError> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            WarehouseError::permission_denied(format!("Failed to initialize GCP auth: {e}"))
        })?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl AccessTokenSource for GcpTokenSource {
    async fn access_token(&self) -> Result<String, WarehouseError> {
        let token = self
            .provider
            .token(&[BIGQUERY_SCOPE])
            .await
            .map_err(|e| WarehouseError::transient(format!("Failed to get GCP access token: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

/// A fixed token, e.g. from `gcloud auth print-access-token`.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, WarehouseError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_returns_value() {
        let source = StaticToken::new("ya29.test");
        assert_eq!(source.access_token().await.unwrap(), "ya29.test");
    }

    #[test]
    fn static_token_debug_is_redacted() {
        let source = StaticToken::new("ya29.secret");
        assert!(!format!("{source:?}").contains("secret"));
    }
}
