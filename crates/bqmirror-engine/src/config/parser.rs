//! Config YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::types::ReplicationConfig;
use crate::errors::ConfigError;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnv`] naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                if !missing.iter().any(|m| m == var_name) {
                    missing.push(var_name.to_string());
                }
            }
        }
    }

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnv(missing));
    }

    Ok(result)
}

/// Parse a config YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_config_str(yaml_str: &str) -> Result<ReplicationConfig, ConfigError> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: ReplicationConfig = serde_yaml::from_str(&substituted)?;
    Ok(config)
}

/// Parse a config YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_config(path: &Path) -> Result<ReplicationConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("BQM_TEST_SRC_PROJECT", "ops-prod");
        let input = "project: ${BQM_TEST_SRC_PROJECT}\ndataset: ade_api";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("ops-prod"));
        assert!(!result.contains("${BQM_TEST_SRC_PROJECT}"));
        std::env::remove_var("BQM_TEST_SRC_PROJECT");
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = "tables: [users]";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_missing_env_vars_all_reported_once() {
        let input = "${BQM_MISSING_X} ${BQM_MISSING_Y} ${BQM_MISSING_X}";
        match substitute_env_vars(input) {
            Err(ConfigError::MissingEnv(vars)) => {
                assert_eq!(vars, vec!["BQM_MISSING_X", "BQM_MISSING_Y"]);
            }
            other => panic!("expected MissingEnv, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_from_string() {
        std::env::set_var("BQM_TEST_DST_PROJECT", "agentspace-dev");
        let yaml = r#"
version: "1.0"
source:
  project: ops-prod
  dataset: ade_api
destination:
  project: ${BQM_TEST_DST_PROJECT}
  dataset: mirror
location: US
tables: [users, orders]
views: [active_users]
concurrency: 4
retry:
  max_attempts: 5
"#;
        let config = parse_config_str(yaml).unwrap();
        assert_eq!(config.destination.project, "agentspace-dev");
        assert_eq!(config.location.as_deref(), Some("US"));
        assert_eq!(config.tables, vec!["users", "orders"]);
        assert_eq!(config.views, vec!["active_users"]);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1_000);
        std::env::remove_var("BQM_TEST_DST_PROJECT");
    }

    #[test]
    fn test_parse_invalid_yaml_errors() {
        let result = parse_config_str("this is not: [valid: yaml: {{{}}}");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parse_config_file_not_found() {
        let result = parse_config(Path::new("/nonexistent/bqmirror.yaml"));
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
