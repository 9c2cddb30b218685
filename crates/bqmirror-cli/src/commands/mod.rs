pub mod check;
pub mod discover;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bqmirror_engine::config::parser;
use bqmirror_engine::config::ReplicationConfig;
use bqmirror_warehouse::{
    AccessTokenSource, BigQueryConfig, BigQueryWarehouse, GcpTokenSource, StaticToken, Warehouse,
};

/// Static bearer token, bypassing application default credentials.
const ACCESS_TOKEN_ENV: &str = "BQMIRROR_ACCESS_TOKEN";

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub location: Option<String>,
    pub concurrency: Option<usize>,
}

impl Overrides {
    fn apply(&self, config: &mut ReplicationConfig) {
        if let Some(location) = &self.location {
            config.location = Some(location.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

/// Parse the config file and apply command-line overrides.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<ReplicationConfig> {
    let mut config = parser::parse_config(path)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    overrides.apply(&mut config);
    Ok(config)
}

/// Build the BigQuery client for a config, resolving credentials.
pub async fn build_warehouse(config: &ReplicationConfig) -> Result<Arc<dyn Warehouse>> {
    let tokens: Arc<dyn AccessTokenSource> = match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            tracing::debug!("Using static access token from {ACCESS_TOKEN_ENV}");
            Arc::new(StaticToken::new(token.trim()))
        }
        _ => Arc::new(
            GcpTokenSource::discover()
                .await
                .context("Failed to resolve Google Cloud credentials")?,
        ),
    };

    let mut bq_config = BigQueryConfig::new(config.job_project())
        .with_location(config.location.clone())
        .with_poll_interval(config.warehouse.poll_interval())
        .with_job_timeout(config.warehouse.job_timeout());
    if let Some(endpoint) = &config.warehouse.endpoint {
        bq_config = bq_config.with_endpoint(endpoint.clone());
    }

    let warehouse =
        BigQueryWarehouse::new(bq_config, tokens).context("Failed to create BigQuery client")?;
    Ok(Arc::new(warehouse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
version: "1.0"
source: { project: ops-prod, dataset: ade_api }
destination: { project: agentspace-dev, dataset: mirror }
location: EU
tables: [users]
"#;

    #[test]
    fn overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let overrides = Overrides {
            location: Some("US".into()),
            concurrency: Some(4),
        };
        let config = load_config(file.path(), &overrides).unwrap();
        assert_eq!(config.location.as_deref(), Some("US"));
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn file_values_kept_without_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = load_config(file.path(), &Overrides::default()).unwrap();
        assert_eq!(config.location.as_deref(), Some("EU"));
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn missing_file_error_names_path() {
        let err = load_config(Path::new("/nonexistent/bq.yaml"), &Overrides::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/bq.yaml"));
    }
}
