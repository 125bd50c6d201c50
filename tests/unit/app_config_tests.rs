/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use subsession::app_config::{Config, LogLevel};
use subsession::translation::BackoffPolicy;
use std::time::Duration;
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "English");
    assert_eq!(config.target_language, "Portuguese");
    assert_eq!(config.context, "");
    assert!(config.save_progress);
    assert_eq!(config.base_delay_secs, 30);
    assert_eq!(config.max_backoff_secs, 300);
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.completion.threshold_percent, 99.0);
    assert_eq!(config.completion.required_streak, 2);
    assert_eq!(config.provider.model, "gemini-1.5-pro");
    assert!(config.provider.api_keys.is_empty());
    assert_eq!(config.provider.session.generation.top_k, 64);
    assert_eq!(config.provider.session.generation.max_output_tokens, 8192);
    assert_eq!(config.provider.session.safety_settings.len(), 4);
    assert!(config.provider.session.safety_settings.iter().all(|s| s.threshold == "BLOCK_NONE"));
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.target_language = "  ".to_string();
    assert!(config.validate().is_err());
    config.target_language = "pt".to_string();

    config.max_retries = 0;
    assert!(config.validate().is_err());
    config.max_retries = 1;
    assert!(config.validate().is_ok());

    config.base_delay_secs = 400;
    assert!(config.validate().is_err());
    config.base_delay_secs = 30;

    config.completion.threshold_percent = 0.0;
    assert!(config.validate().is_err());
    config.completion.threshold_percent = 100.5;
    assert!(config.validate().is_err());
    config.completion.threshold_percent = 100.0;
    assert!(config.validate().is_ok());

    config.completion.required_streak = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() -> Result<()> {
    let json = r#"{
        "target_language": "es",
        "max_retries": 3,
        "provider": { "api_keys": ["k1", " ", "k2 "] },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json)?;

    assert_eq!(config.source_language, "English");
    assert_eq!(config.target_language, "es");
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.provider.model, "gemini-1.5-pro");
    assert_eq!(config.api_keys(), vec!["k1".to_string(), "k2".to_string()]);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
    Ok(())
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());
    assert_eq!(created, Config::default());

    let mut edited = created.clone();
    edited.context = "A medical drama".to_string();
    edited.save(&path)?;

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.context, "A medical drama");
    Ok(())
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_engineConfig_shouldCarrySettings() {
    let mut config = Config::default();
    config.save_progress = false;
    config.base_delay_secs = 2;
    config.max_backoff_secs = 20;
    config.completion.required_streak = 4;

    let engine = config.engine_config();

    assert!(!engine.save_progress);
    assert_eq!(engine.max_retries, 5);
    assert_eq!(engine.backoff, BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(20)));
    assert_eq!(engine.completion_required_streak, 4);
    assert_eq!(engine.session, config.provider.session);
}
