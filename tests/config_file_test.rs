// Integration test for configuration file support

use logtail::config::{StreamSelectionPolicy, TailConfig};
use logtail::LogTailError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_toml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logtail.toml");

    let toml_content = r#"
        region = "us-east-1"
        log_group_name = "test-logs"
        stream_selection_policy = "most-recent"
        page_limit = 500
        start_from_head = false
        profile = "dev"
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let config = TailConfig::from_file(&config_path).unwrap();
    assert_eq!(config.region.as_deref(), Some("us-east-1"));
    assert_eq!(config.log_group_name.as_deref(), Some("test-logs"));
    assert_eq!(
        config.stream_selection_policy,
        StreamSelectionPolicy::MostRecent
    );
    assert_eq!(config.page_limit, Some(500));
    assert!(!config.start_from_head);
    assert_eq!(config.profile.as_deref(), Some("dev"));
}

#[test]
fn test_load_json_config_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logtail.json");

    fs::write(&config_path, r#"{ "log_group_name": "test-logs" }"#).unwrap();

    let config = TailConfig::from_file(&config_path).unwrap();
    assert_eq!(config.log_group_name.as_deref(), Some("test-logs"));
    assert_eq!(config.region, None);
    assert_eq!(config.stream_selection_policy, StreamSelectionPolicy::First);
    assert_eq!(config.page_limit, None);
    assert!(config.start_from_head);
}

#[test]
fn test_load_config_expands_env_vars() {
    std::env::set_var("LOGTAIL_IT_REGION", "ap-southeast-2");

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logtail.toml");
    fs::write(&config_path, r#"region = "$LOGTAIL_IT_REGION""#).unwrap();

    let config = TailConfig::from_file(&config_path).unwrap();
    assert_eq!(config.region.as_deref(), Some("ap-southeast-2"));
}

#[test]
fn test_load_config_rejects_invalid_page_limit() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logtail.toml");
    fs::write(&config_path, "page_limit = 20000").unwrap();

    let result = TailConfig::from_file(&config_path);
    assert!(matches!(
        result,
        Err(LogTailError::ConfigValidationError(_))
    ));
}

#[test]
fn test_load_config_rejects_malformed_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logtail.toml");
    fs::write(&config_path, "region = ").unwrap();

    let result = TailConfig::from_file(&config_path);
    assert!(matches!(result, Err(LogTailError::InvalidConfig(_))));
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = TailConfig::from_file(&temp_dir.path().join("absent.toml"));
    assert!(matches!(result, Err(LogTailError::ConfigError(_))));
}
