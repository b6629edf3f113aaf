use super::*;
use crate::schema::Config;
use tablewatch_protocols::{FieldMapping, TargetDefinition};

fn bond(name: &str, row: &str) -> TargetDefinition {
    TargetDefinition::new(
        name,
        vec![
            FieldMapping::new("UTCTime", row, "Time"),
            FieldMapping::new("Value", row, "Yield"),
        ],
    )
}

fn valid_config() -> Config {
    let mut config = Config::default();
    config.source.url = "https://example.com/bonds".to_string();
    config.source.row_label_column = "Country".to_string();
    config.source.table.attribute = "id".to_string();
    config.source.table.value = "bonds".to_string();
    config.targets = vec![
        bond("German10yrbond", "Germany"),
        bond("French10yrbond", "France"),
    ];
    config
}

fn has_error(result: &ValidationResult, path: &str) -> bool {
    result.errors.iter().any(|e| e.path == path)
}

#[test]
fn test_validate_valid_config() {
    let result = ConfigValidator::validate(&valid_config()).unwrap();
    assert!(result.is_valid(), "{:?}", result.errors);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_default_config_is_incomplete() {
    let result = ConfigValidator::validate(&Config::default()).unwrap();
    assert!(!result.is_valid());
    assert!(has_error(&result, "source.url"));
    assert!(has_error(&result, "source.table"));
    assert!(has_error(&result, "targets"));
}

#[test]
fn test_validate_url_scheme() {
    let mut config = valid_config();
    config.source.url = "ftp://example.com/bonds".to_string();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "source.url"));

    config.source.url = "not a url".to_string();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "source.url"));
}

#[test]
fn test_validate_zero_timeouts() {
    let mut config = valid_config();
    config.browser.read_timeout_secs = 0;
    config.browser.navigation_attempts = 0;
    config.browser.lifetime_secs = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "browser.read_timeout_secs"));
    assert!(has_error(&result, "browser.navigation_attempts"));
    assert!(has_error(&result, "browser.lifetime_secs"));
}

#[test]
fn test_validate_cycle_interval() {
    let mut config = valid_config();
    config.run.min_cycle_secs = 0.0;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "run.min_cycle_secs"));

    config.run.min_cycle_secs = f64::NAN;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "run.min_cycle_secs"));
}

#[test]
fn test_validate_unsupported_timezone() {
    let mut config = valid_config();
    config.source.timezone = "EST".to_string();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "source.timezone"));
}

#[test]
fn test_validate_duplicate_target() {
    let mut config = valid_config();
    config.targets.push(bond("German10yrbond", "Germany"));
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "targets[2].name"));
}

#[test]
fn test_validate_invalid_table_name() {
    let mut config = valid_config();
    config.targets[0].name = "German 10yr; DROP".to_string();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "targets[0].name"));
}

#[test]
fn test_validate_temporal_first() {
    let mut config = valid_config();
    config.targets[0].fields.swap(0, 1);
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "targets[0].fields[0]"));
}

#[test]
fn test_validate_temporal_repeated() {
    let mut config = valid_config();
    config.targets[1]
        .fields
        .push(FieldMapping::new("UTCTime", "France", "Time"));
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "targets[1].fields[2]"));
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.message.contains("more than once"))
    );
}

#[test]
fn test_validate_duplicate_field() {
    let mut config = valid_config();
    config.targets[0]
        .fields
        .push(FieldMapping::new("Value", "Germany", "Chg"));
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(has_error(&result, "targets[0].fields[2]"));
}

#[test]
fn test_lifetime_shorter_than_cycle_warns() {
    let mut config = valid_config();
    config.browser.lifetime_secs = 5;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "browser.lifetime_secs"));
}

#[test]
fn test_headless_ignored_for_http_warns() {
    let mut config = valid_config();
    config.browser.engine = EngineKind::Http;
    config.browser.headless = false;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "browser.headless"));
}

#[test]
fn test_executable_ignored_with_remote_endpoint_warns() {
    let mut config = valid_config();
    config.browser.remote_endpoint = Some("http://127.0.0.1:9222".to_string());
    config.browser.executable = Some("/usr/bin/chromium".into());
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "browser.executable"));
}

#[test]
fn test_into_result() {
    let warnings = ConfigValidator::validate(&valid_config())
        .unwrap()
        .into_result()
        .unwrap();
    assert!(warnings.is_empty());

    let err = ConfigValidator::validate(&Config::default())
        .unwrap()
        .into_result()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("source.url")));
}

#[test]
fn test_shipped_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/tablewatch.toml");
    let config = crate::ConfigLoader::load(&path).unwrap();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid(), "{:?}", result.errors);
    assert_eq!(config.targets.len(), 3);
}
