//! Semantic validation for parsed replication config values.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::types::ReplicationConfig;
use crate::errors::ConfigError;

/// Project IDs, optionally domain-scoped (`example.com:my-project`).
static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z][a-z0-9.-]*:)?[a-z][a-z0-9-]{4,28}[a-z0-9]$").expect("valid project regex")
});

static DATASET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid dataset regex"));

/// Table names: letters, marks, numbers, connectors (`_`) and dashes.
static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{M}\p{N}\p{Pc}\p{Pd}]+$").expect("valid table regex")
});

const MAX_IDENTIFIER_CHARS: usize = 1024;

fn is_identifier(re: &Regex, name: &str) -> bool {
    name.chars().count() <= MAX_IDENTIFIER_CHARS && re.is_match(name)
}

fn validate_names(names: &[String], kind: &str, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for (i, name) in names.iter().enumerate() {
        if !is_identifier(&TABLE_RE, name) {
            errors.push(format!("{kind}[{i}]: '{name}' is not a valid table name"));
        }
        if !seen.insert(name.as_str()) {
            errors.push(format!("{kind}[{i}]: duplicate name '{name}'"));
        }
    }
}

/// Validate a parsed replication config.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns [`ConfigError::EmptyCatalogue`] when no tables or views are listed,
/// otherwise [`ConfigError::Invalid`] listing every problem found.
pub fn validate_config(config: &ReplicationConfig) -> Result<(), ConfigError> {
    if config.tables.is_empty() && config.views.is_empty() {
        return Err(ConfigError::EmptyCatalogue);
    }

    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported config version '{}', expected '1.0'",
            config.version
        ));
    }

    for (label, project) in [
        ("source.project", &config.source.project),
        ("destination.project", &config.destination.project),
    ] {
        if !PROJECT_RE.is_match(project) {
            errors.push(format!("{label}: '{project}' is not a valid project ID"));
        }
    }
    for (label, dataset) in [
        ("source.dataset", &config.source.dataset),
        ("destination.dataset", &config.destination.dataset),
    ] {
        if !is_identifier(&DATASET_RE, dataset) {
            errors.push(format!("{label}: '{dataset}' is not a valid dataset ID"));
        }
    }

    if config.source.project == config.destination.project
        && config.source.dataset == config.destination.dataset
    {
        errors.push("source and destination must be different datasets".to_string());
    }

    if let Some(location) = &config.location {
        if location.trim().is_empty() {
            errors.push("location must not be empty when set".to_string());
        }
    }

    validate_names(&config.tables, "tables", &mut errors);
    validate_names(&config.views, "views", &mut errors);

    let tables: HashSet<&str> = config.tables.iter().map(String::as_str).collect();
    for view in &config.views {
        if tables.contains(view.as_str()) {
            tracing::warn!(
                name = %view,
                "Name is listed as both a table and a view; the view materialization overwrites the copied table"
            );
        }
    }

    if config.concurrency == 0 {
        errors.push("concurrency must be at least 1".to_string());
    }

    if config.retry.max_attempts == 0 {
        errors.push("retry.max_attempts must be at least 1".to_string());
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(format!(
            "retry.base_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
            config.retry.base_delay_ms, config.retry.max_delay_ms
        ));
    }

    if config.warehouse.poll_interval_ms == 0 {
        errors.push("warehouse.poll_interval_ms must be > 0".to_string());
    }
    if config.warehouse.job_timeout_secs == 0 {
        errors.push("warehouse.job_timeout_secs must be > 0".to_string());
    }
    if let Some(project) = &config.warehouse.job_project {
        if !PROJECT_RE.is_match(project) {
            errors.push(format!(
                "warehouse.job_project: '{project}' is not a valid project ID"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_config_str;

    fn base_config() -> ReplicationConfig {
        parse_config_str(
            r#"
version: "1.0"
source: { project: ops-prod, dataset: ade_api }
destination: { project: agentspace-dev, dataset: mirror }
tables: [users, orders]
views: [active_users]
"#,
        )
        .unwrap()
    }

    fn invalid_messages(config: &ReplicationConfig) -> Vec<String> {
        match validate_config(config) {
            Err(ConfigError::Invalid(errors)) => errors,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_empty_catalogue_rejected() {
        let mut config = base_config();
        config.tables.clear();
        config.views.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::EmptyCatalogue)
        ));
    }

    #[test]
    fn test_views_only_catalogue_is_valid() {
        let mut config = base_config();
        config.tables.clear();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_within_kind_rejected() {
        let mut config = base_config();
        config.tables.push("users".into());
        let errors = invalid_messages(&config);
        assert!(errors.iter().any(|e| e.contains("duplicate name 'users'")));
    }

    #[test]
    fn test_same_name_across_kinds_is_allowed() {
        let mut config = base_config();
        config.views.push("users".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_identifiers_rejected() {
        let mut config = base_config();
        config.tables.push("bad`name".into());
        config.views.push(String::new());
        config.source.project = "X".into();
        config.destination.dataset = "has-dash".into();
        let errors = invalid_messages(&config);
        assert!(errors.iter().any(|e| e.contains("bad`name")));
        assert!(errors.iter().any(|e| e.starts_with("views[1]")));
        assert!(errors.iter().any(|e| e.contains("source.project")));
        assert!(errors.iter().any(|e| e.contains("destination.dataset")));
    }

    #[test]
    fn test_overlong_table_name_rejected() {
        let mut config = base_config();
        config.tables.push("t".repeat(1025));
        let errors = invalid_messages(&config);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_domain_scoped_project_accepted() {
        let mut config = base_config();
        config.source.project = "example.com:ops-prod".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_same_source_and_destination_rejected() {
        let mut config = base_config();
        config.destination.project = config.source.project.clone();
        config.destination.dataset = config.source.dataset.clone();
        let errors = invalid_messages(&config);
        assert!(errors.iter().any(|e| e.contains("different datasets")));
    }

    #[test]
    fn test_zero_concurrency_and_attempts_rejected() {
        let mut config = base_config();
        config.concurrency = 0;
        config.retry.max_attempts = 0;
        let errors = invalid_messages(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_blank_location_rejected() {
        let mut config = base_config();
        config.location = Some("  ".into());
        let errors = invalid_messages(&config);
        assert!(errors.iter().any(|e| e.contains("location")));
    }

    #[test]
    fn test_unsupported_version() {
        let mut config = base_config();
        config.version = "2.0".into();
        let errors = invalid_messages(&config);
        assert!(errors[0].contains("Unsupported config version"));
    }
}
