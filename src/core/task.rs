//! Retryable unit of work and its attempt bookkeeping.

use std::collections::HashSet;
use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;

use crate::core::ClientId;

/// Identifier of a task, assigned from its position at construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Why a task ended in the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The retry budget reached zero.
    #[error("attempts exhausted")]
    AttemptsExhausted,
    /// Every live client was tried and failed for this task.
    #[error("exclusion exhausted")]
    ExclusionExhausted,
    /// The executor declared the task permanently failed.
    #[error("rejected by executor")]
    Rejected,
}

/// Lifecycle position of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue.
    Pending,
    /// Running against one client.
    Executing(ClientId),
    /// Finished successfully.
    Succeeded,
    /// Finished unsuccessfully.
    Failed(FailureReason),
}

impl TaskStatus {
    /// Whether this status is absorbing.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }
}

#[derive(Debug)]
struct Attempts {
    left: u32,
    made: u32,
    excluded: HashSet<ClientId>,
    status: TaskStatus,
}

/// A payload plus its retry budget and the clients it has already failed on.
///
/// The payload is immutable; all bookkeeping sits behind a task-local lock
/// and is only mutated by the scheduler.
#[derive(Debug)]
pub struct Task<P> {
    id: TaskId,
    payload: P,
    attempts: Mutex<Attempts>,
}

impl<P> Task<P> {
    pub(crate) fn new(id: TaskId, payload: P, attempts: u32) -> Self {
        Self {
            id,
            payload,
            attempts: Mutex::new(Attempts {
                left: attempts,
                made: 0,
                excluded: HashSet::new(),
                status: TaskStatus::Pending,
            }),
        }
    }

    /// Task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Caller-supplied payload.
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    /// Remaining retry budget.
    #[must_use]
    pub fn attempts_left(&self) -> u32 {
        self.attempts.lock().left
    }

    /// Attempts dispatched so far, including one currently executing.
    #[must_use]
    pub fn attempts_made(&self) -> u32 {
        self.attempts.lock().made
    }

    /// Whether `client` already failed for this task.
    #[must_use]
    pub fn is_excluded(&self, client: ClientId) -> bool {
        self.attempts.lock().excluded.contains(&client)
    }

    /// Number of clients this task is excluded from.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.attempts.lock().excluded.len()
    }

    /// Excluded clients in id order.
    #[must_use]
    pub fn excluded_clients(&self) -> Vec<ClientId> {
        let mut ids: Vec<_> = self.attempts.lock().excluded.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Current lifecycle position.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.attempts.lock().status
    }

    /// Whether the task has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Pending -> Executing. Returns false if the task was not pending.
    pub(crate) fn mark_executing(&self, client: ClientId) -> bool {
        let mut attempts = self.attempts.lock();
        if attempts.status != TaskStatus::Pending {
            return false;
        }
        attempts.status = TaskStatus::Executing(client);
        attempts.made += 1;
        true
    }

    /// Back to pending ahead of re-enqueueing. Terminal tasks stay terminal.
    pub(crate) fn requeue(&self) -> bool {
        let mut attempts = self.attempts.lock();
        if attempts.status.is_terminal() {
            return false;
        }
        attempts.status = TaskStatus::Pending;
        true
    }

    /// Record a failed attempt on `client`, returning the remaining budget.
    pub(crate) fn record_failed_attempt(&self, client: ClientId) -> u32 {
        let mut attempts = self.attempts.lock();
        attempts.excluded.insert(client);
        attempts.left = attempts.left.saturating_sub(1);
        attempts.left
    }

    /// Forget every exclusion so all live clients become eligible again.
    pub(crate) fn clear_exclusions(&self) {
        self.attempts.lock().excluded.clear();
    }

    /// Move into a terminal status. Only the first call has any effect and
    /// returns true; later calls are no-ops.
    pub(crate) fn finish(&self, status: TaskStatus) -> bool {
        debug_assert!(status.is_terminal());
        let mut attempts = self.attempts.lock();
        if attempts.status.is_terminal() {
            return false;
        }
        attempts.status = status;
        true
    }
}
