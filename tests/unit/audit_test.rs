//! Tests for audit sink

use retry_lot::core::{
    build_audit_event, AuditAction, AuditSink, ClientId, InMemoryAuditSink, TaskId,
};
use uuid::Uuid;

#[test]
fn test_in_memory_audit_sink() {
    let run_id = Uuid::new_v4();
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        run_id,
        Some(TaskId(1)),
        Some(ClientId(0)),
        AuditAction::Dispatch,
        Some("attempt 1".to_string()),
    );

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].run_id, run_id);
    assert_eq!(events[0].task_id, Some(TaskId(1)));
    assert_eq!(events[0].action, AuditAction::Dispatch);
}

#[test]
fn test_audit_sink_overflow() {
    let run_id = Uuid::new_v4();
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(run_id, Some(TaskId(1)), None, AuditAction::Requeue, None));
    sink.record(build_audit_event(run_id, Some(TaskId(2)), None, AuditAction::Requeue, None));
    sink.record(build_audit_event(run_id, Some(TaskId(3)), None, AuditAction::Requeue, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].task_id, Some(TaskId(2))); // First one popped
    assert_eq!(events[1].task_id, Some(TaskId(3)));
}

#[test]
fn test_build_audit_event() {
    let run_id = Uuid::new_v4();
    let event = build_audit_event(
        run_id,
        None,
        Some(ClientId(4)),
        AuditAction::Retire,
        Some("banned".to_string()),
    );

    assert_eq!(event.run_id, run_id);
    assert_eq!(event.task_id, None);
    assert_eq!(event.client_id, Some(ClientId(4)));
    assert_eq!(event.action, AuditAction::Retire);
    assert_eq!(event.detail, Some("banned".to_string()));
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_audit_event_serializes_snake_case_action() {
    let event = build_audit_event(Uuid::new_v4(), None, None, AuditAction::Exhausted, None);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "exhausted");
}
