//! Engine error model and retry backoff policy helpers.

use std::path::PathBuf;
use std::time::Duration;

use bqmirror_types::WarehouseError;

use crate::config::RetryConfig;

/// Fatal, pre-run configuration problems. No warehouse call is made once
/// one of these is raised.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing environment variable(s): {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Catalogue is empty: configure at least one table or view")]
    EmptyCatalogue,

    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

/// Errors that stop a run before any item is attempted.
///
/// Per-item warehouse failures are never surfaced here; they are recorded in
/// the run report instead.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Destination dataset preflight (`create_if_missing`) failed.
    #[error("Preflight failed: {0}")]
    Preflight(#[source] WarehouseError),
}

/// Delay before retry number `attempt` (1-based: the delay after the first
/// failed attempt is `compute_backoff(policy, 1)`).
pub(crate) fn compute_backoff(policy: &RetryConfig, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    let delay_ms = policy.base_delay_ms.saturating_mul(factor);
    Duration::from_millis(delay_ms.min(policy.max_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = RetryConfig::default();
        assert_eq!(compute_backoff(&policy, 1), Duration::from_millis(1_000));
        assert_eq!(compute_backoff(&policy, 2), Duration::from_millis(2_000));
        assert_eq!(compute_backoff(&policy, 3), Duration::from_millis(4_000));
    }

    #[test]
    fn test_backoff_capped() {
        let policy = RetryConfig::default();
        assert_eq!(compute_backoff(&policy, 5), Duration::from_millis(10_000));
        assert_eq!(compute_backoff(&policy, 80), Duration::from_millis(10_000));
    }

    #[test]
    fn test_backoff_zero_base() {
        let policy = RetryConfig {
            max_attempts: 3,
            base_delay_ms: 0,
            max_delay_ms: 0,
        };
        assert_eq!(compute_backoff(&policy, 2), Duration::ZERO);
    }

    #[test]
    fn test_config_error_display_lists_all_problems() {
        let err = ConfigError::Invalid(vec!["first".into(), "second".into()]);
        let msg = err.to_string();
        assert!(msg.contains("first"));
        assert!(msg.contains("second"));
    }

    #[test]
    fn test_run_error_from_config_error() {
        let err: RunError = ConfigError::EmptyCatalogue.into();
        assert!(matches!(err, RunError::Config(ConfigError::EmptyCatalogue)));
        assert!(err.to_string().contains("Catalogue is empty"));
    }

    #[test]
    fn test_preflight_display() {
        let err = RunError::Preflight(WarehouseError::location_mismatch("EU vs US"));
        assert!(err.to_string().contains("LOCATION_MISMATCH"));
    }
}
