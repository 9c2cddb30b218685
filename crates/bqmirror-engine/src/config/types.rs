//! Replication config types deserialized from YAML.

use std::time::Duration;

use bqmirror_types::{DatasetRef, ReplicationTarget};
use serde::Deserialize;

use crate::catalogue::Catalogue;

const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 3_600;

/// Top-level replication config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicationConfig {
    pub version: String,
    pub source: DatasetConfig,
    pub destination: DestinationConfig,
    /// Region for copy jobs. Omit to let the warehouse infer it.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub views: Vec<String>,
    /// Maximum warehouse operations in flight within a phase.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub warehouse: WarehouseSettings,
}

impl ReplicationConfig {
    #[must_use]
    pub fn target(&self) -> ReplicationTarget {
        ReplicationTarget {
            source: DatasetRef::new(self.source.project.clone(), self.source.dataset.clone()),
            destination: DatasetRef::new(
                self.destination.project.clone(),
                self.destination.dataset.clone(),
            ),
            location: self.location.clone(),
        }
    }

    #[must_use]
    pub fn catalogue(&self) -> Catalogue {
        Catalogue::new(self.tables.clone(), self.views.clone())
    }

    /// Project that runs copy/query jobs: explicit setting, else the destination project.
    #[must_use]
    pub fn job_project(&self) -> &str {
        self.warehouse
            .job_project
            .as_deref()
            .unwrap_or(&self.destination.project)
    }
}

/// A `project` + `dataset` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub project: String,
    pub dataset: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    pub project: String,
    pub dataset: String,
    /// Create the destination dataset in the source dataset's region when missing.
    #[serde(default)]
    pub create_if_missing: bool,
}

/// Retry policy for transient warehouse errors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per item, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

/// BigQuery client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarehouseSettings {
    /// REST endpoint override (emulators, tests).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub job_project: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

impl WarehouseSettings {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            job_project: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_job_timeout_secs() -> u64 {
    DEFAULT_JOB_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
version: "1.0"
source: { project: ops-prod, dataset: ade_api }
destination: { project: agentspace-dev, dataset: mirror }
tables: [users]
"#;

    #[test]
    fn defaults_applied() {
        let config: ReplicationConfig = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.location.is_none());
        assert!(config.views.is_empty());
        assert!(!config.destination.create_if_missing);
        assert_eq!(config.warehouse.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn target_and_job_project() {
        let config: ReplicationConfig = serde_yaml::from_str(MINIMAL).unwrap();
        let target = config.target();
        assert_eq!(target.source.to_string(), "ops-prod.ade_api");
        assert_eq!(target.destination.to_string(), "agentspace-dev.mirror");
        assert_eq!(config.job_project(), "agentspace-dev");
    }

    #[test]
    fn unknown_fields_rejected() {
        let yaml = format!("{MINIMAL}overwrite: true\n");
        assert!(serde_yaml::from_str::<ReplicationConfig>(&yaml).is_err());
    }
}
