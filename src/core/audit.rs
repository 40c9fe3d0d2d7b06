//! Audit sink implementations.
//!
//! Records scheduler lifecycle events (dispatch, release, retirement, requeue,
//! terminal transitions) for later inspection.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::core::{ClientId, TaskId};
use crate::util::clock::now_ms;

/// Lifecycle action captured by an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A task was paired with a client and handed to an execution unit.
    Dispatch,
    /// A client went back to the idle set.
    Release,
    /// A client was permanently removed from circulation.
    Retire,
    /// A task went back to the queue for another attempt.
    Requeue,
    /// A task finished successfully.
    Succeed,
    /// A task finished unsuccessfully.
    Fail,
    /// The run stopped because no usable clients remain.
    Exhausted,
}

/// Audit event structure.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuditEvent {
    /// Run that produced the event.
    pub run_id: Uuid,
    /// Related task, if any.
    pub task_id: Option<TaskId>,
    /// Related client, if any.
    pub client_id: Option<ClientId>,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Shared sink: the scheduler records through one handle while the caller
/// keeps another to inspect events.
impl<S: AuditSink> AuditSink for Arc<Mutex<S>> {
    fn record(&mut self, event: AuditEvent) {
        self.lock().record(event);
    }
}

/// Helper to build an audit event stamped with the current time.
#[must_use]
pub fn build_audit_event(
    run_id: Uuid,
    task_id: Option<TaskId>,
    client_id: Option<ClientId>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        run_id,
        task_id,
        client_id,
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
