//! Tests for builder modules

use retry_lot::builders::SchedulerBuilder;
use retry_lot::config::{ExclusionPolicy, SchedulerConfig};
use retry_lot::core::{Client, FnExecutor, Outcome, SchedulerError, Task, TaskId, TaskStatus};
use std::time::Duration;

fn succeed(_client: &mut Client<u8>, _task: &Task<String>) -> Outcome {
    Outcome::Success
}

#[test]
fn test_scheduler_builder_defaults() {
    let scheduler = SchedulerBuilder::new()
        .clients([1_u8, 2, 3])
        .tasks(["a".to_string(), "b".to_string()])
        .build(FnExecutor(succeed))
        .unwrap();

    let stats = scheduler.stats();
    assert_eq!(stats.capacity, 3);
    assert_eq!(stats.live_clients, 3);
    assert_eq!(stats.idle_clients, 3);
    assert_eq!(stats.pending_tasks, 2);
    assert_eq!(stats.remaining_tasks, 2);
    assert_eq!(stats.in_flight, 0);

    let task = scheduler.task(TaskId(1)).unwrap();
    assert_eq!(task.payload(), "b");
    assert_eq!(task.attempts_left(), SchedulerConfig::default().attempts);
    assert_eq!(task.status(), TaskStatus::Pending);
}

#[test]
fn test_scheduler_builder_from_config() {
    let config = SchedulerConfig {
        attempts: 9,
        exclusion: ExclusionPolicy::Recycle,
        acquire_timeout_ms: None,
        worker_threads: Some(1),
    };
    let scheduler = SchedulerBuilder::new()
        .clients([0_u8])
        .tasks(["x".to_string()])
        .config(config)
        .acquire_timeout(Duration::from_millis(50))
        .build(FnExecutor(succeed))
        .unwrap();
    assert_eq!(scheduler.task(TaskId(0)).unwrap().attempts_left(), 9);
}

#[test]
fn test_scheduler_builder_rejects_invalid_config() {
    let result = SchedulerBuilder::new()
        .clients([0_u8])
        .tasks(["x".to_string()])
        .worker_threads(0)
        .build(FnExecutor(succeed));
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_scheduler_builder_allows_empty_inputs() {
    let scheduler = SchedulerBuilder::<u8, String>::new()
        .build(FnExecutor(succeed))
        .unwrap();
    assert_eq!(scheduler.pool().capacity(), 0);
    assert_eq!(scheduler.tasks().count(), 0);
}
