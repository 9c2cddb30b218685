//! Warehouse error taxonomy.
//!
//! Every failed warehouse call is classified into a [`WarehouseErrorKind`].
//! Only [`WarehouseErrorKind::Transient`] is considered safe to retry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad classification of a warehouse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarehouseErrorKind {
    /// Source object (or dataset) does not exist.
    NotFound,
    /// Caller lacks permission on source or destination.
    PermissionDenied,
    /// Source and destination are in different regions, or the job region
    /// does not match them.
    LocationMismatch,
    /// Project or user quota exhausted.
    QuotaExceeded,
    /// Network or service hiccup (retryable).
    Transient,
    /// Anything not classified above.
    Unknown,
}

impl WarehouseErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::LocationMismatch => "LOCATION_MISMATCH",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::Transient => "TRANSIENT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for WarehouseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure from a warehouse operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct WarehouseError {
    pub kind: WarehouseErrorKind,
    pub message: String,
}

impl WarehouseError {
    #[must_use]
    pub fn new(kind: WarehouseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::NotFound, message)
    }

    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::PermissionDenied, message)
    }

    #[must_use]
    pub fn location_mismatch(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::LocationMismatch, message)
    }

    #[must_use]
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::QuotaExceeded, message)
    }

    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::Transient, message)
    }

    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::Unknown, message)
    }

    /// Whether the orchestrator may retry the failed call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind == WarehouseErrorKind::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(WarehouseError::transient("reset").is_retryable());
        for err in [
            WarehouseError::not_found("x"),
            WarehouseError::permission_denied("x"),
            WarehouseError::location_mismatch("x"),
            WarehouseError::quota_exceeded("x"),
            WarehouseError::unknown("x"),
        ] {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = WarehouseError::permission_denied("bigquery.tables.getData denied");
        assert_eq!(
            err.to_string(),
            "[PERMISSION_DENIED] bigquery.tables.getData denied"
        );
    }

    #[test]
    fn kind_serializes_screaming_case() {
        let json = serde_json::to_string(&WarehouseErrorKind::LocationMismatch).unwrap();
        assert_eq!(json, r#""LOCATION_MISMATCH""#);
    }
}
