//! Tests for configuration validation

use retry_lot::config::{ExclusionPolicy, SchedulerConfig};
use retry_lot::core::SchedulerError;
use std::time::Duration;

#[test]
fn test_scheduler_config_validation() {
    let valid = SchedulerConfig {
        attempts: 5,
        exclusion: ExclusionPolicy::Recycle,
        acquire_timeout_ms: Some(250),
        worker_threads: Some(2),
    };
    assert!(valid.validate().is_ok());
    assert_eq!(valid.acquire_timeout(), Some(Duration::from_millis(250)));
}

#[test]
fn test_scheduler_config_invalid_attempts() {
    let invalid = SchedulerConfig {
        attempts: 0,
        ..SchedulerConfig::default()
    };
    assert!(matches!(
        invalid.validate(),
        Err(SchedulerError::InvalidConfig(_))
    ));
}

#[test]
fn test_scheduler_config_invalid_timeout() {
    let invalid = SchedulerConfig {
        acquire_timeout_ms: Some(0),
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_worker_threads() {
    let invalid = SchedulerConfig {
        worker_threads: Some(0),
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "attempts": 4,
        "exclusion": "recycle",
        "acquire_timeout_ms": 1000
    }"#;

    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.attempts, 4);
    assert_eq!(config.exclusion, ExclusionPolicy::Recycle);
    assert_eq!(config.acquire_timeout_ms, Some(1000));
    assert_eq!(config.worker_threads, None);
}

#[test]
fn test_scheduler_config_from_json_defaults_exclusion() {
    let config = SchedulerConfig::from_json_str(r#"{ "attempts": 2 }"#).unwrap();
    assert_eq!(config.exclusion, ExclusionPolicy::Exhaust);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "attempts": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
    assert!(SchedulerConfig::from_json_str(r#"{ "attempts": 2, "exclusion": "never" }"#).is_err());
}

#[test]
fn test_scheduler_config_from_env() {
    // The only test in this binary touching RETRY_LOT_* variables.
    std::env::set_var("RETRY_LOT_ATTEMPTS", "7");
    std::env::set_var("RETRY_LOT_EXCLUSION", "recycle");
    let config = SchedulerConfig::from_env().unwrap();
    assert_eq!(config.attempts, 7);
    assert_eq!(config.exclusion, ExclusionPolicy::Recycle);

    std::env::set_var("RETRY_LOT_ATTEMPTS", "many");
    assert!(matches!(
        SchedulerConfig::from_env(),
        Err(SchedulerError::InvalidConfig(_))
    ));

    std::env::remove_var("RETRY_LOT_ATTEMPTS");
    std::env::remove_var("RETRY_LOT_EXCLUSION");
}
