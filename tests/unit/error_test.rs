//! Tests for error types

use retry_lot::core::{AppResult, SchedulerError};

#[test]
fn test_resource_exhausted_error() {
    let err = SchedulerError::ResourceExhausted { pending: 3 };
    assert_eq!(
        format!("{err}"),
        "resource exhausted: 3 task(s) pending with no usable clients"
    );
}

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull("depth 4 reached".to_string());
    assert_eq!(format!("{err}"), "queue full: depth 4 reached");
}

#[test]
fn test_already_running_error() {
    let err = SchedulerError::AlreadyRunning;
    assert_eq!(format!("{err}"), "scheduler is already running");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("attempts must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: attempts must be greater than 0"
    );
}

#[test]
fn test_scheduler_error_converts_into_app_result() {
    fn fails() -> AppResult<()> {
        Err::<(), _>(SchedulerError::Shutdown)?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert_eq!(err.to_string(), "pool has been shut down");
    assert!(matches!(
        err.downcast_ref::<SchedulerError>(),
        Some(SchedulerError::Shutdown)
    ));
}
