use proptest::prelude::*;
use bqmirror_engine::config::parser;
use bqmirror_engine::config::validator;

fn config_yaml(tables: &str, extra: &str) -> String {
    format!(
        r#"
version: "1.0"
source: {{ project: ops-prod, dataset: ade_api }}
destination: {{ project: agentspace-dev, dataset: mirror }}
tables: {tables}
{extra}
"#
    )
}

proptest! {
    #[test]
    fn concurrency_must_be_positive(concurrency in 0_usize..16) {
        let yaml = config_yaml("[users]", &format!("concurrency: {concurrency}"));
        let config = parser::parse_config_str(&yaml).expect("generated yaml must parse");
        let result = validator::validate_config(&config);

        if concurrency == 0 {
            prop_assert!(result.is_err());
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn base_delay_must_not_exceed_cap(base in 0_u64..20_000, cap in 0_u64..20_000) {
        let yaml = config_yaml(
            "[users]",
            &format!("retry: {{ base_delay_ms: {base}, max_delay_ms: {cap} }}"),
        );
        let config = parser::parse_config_str(&yaml).expect("generated yaml must parse");
        let result = validator::validate_config(&config);

        prop_assert_eq!(result.is_ok(), base <= cap);
    }

    #[test]
    fn plain_identifiers_are_valid_table_names(name in "[a-z_][a-z0-9_]{0,40}") {
        let yaml = config_yaml(&format!("[\"{name}\"]"), "");
        let config = parser::parse_config_str(&yaml).expect("generated yaml must parse");
        prop_assert!(validator::validate_config(&config).is_ok());
    }

    #[test]
    fn duplicate_tables_always_rejected(name in "[a-z][a-z0-9_]{0,20}") {
        let yaml = config_yaml(&format!("[\"{name}\", \"{name}\"]"), "");
        let config = parser::parse_config_str(&yaml).expect("generated yaml must parse");
        prop_assert!(validator::validate_config(&config).is_err());
    }
}
