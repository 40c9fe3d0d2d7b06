//! Aggregate run results and live statistics.

use uuid::Uuid;

use crate::core::{ClientId, FailureReason, Task, TaskId, TaskStatus};

/// Final state of one task.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TaskReport {
    /// Task identifier.
    pub task_id: TaskId,
    /// Status when the report was taken.
    pub status: TaskStatus,
    /// Attempts dispatched.
    pub attempts_made: u32,
    /// Budget left.
    pub attempts_left: u32,
    /// Clients the task failed on, in id order.
    pub excluded_clients: Vec<ClientId>,
}

impl TaskReport {
    pub(crate) fn from_task<P>(task: &Task<P>) -> Self {
        Self {
            task_id: task.id(),
            status: task.status(),
            attempts_made: task.attempts_made(),
            attempts_left: task.attempts_left(),
            excluded_clients: task.excluded_clients(),
        }
    }
}

/// Outcome of a whole run, ordered by task id.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunSummary {
    /// Identifier of the run.
    pub run_id: Uuid,
    /// One report per task.
    pub reports: Vec<TaskReport>,
    /// Clients retired during the run.
    pub retired_clients: Vec<ClientId>,
}

impl RunSummary {
    /// Tasks that finished successfully.
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == TaskStatus::Succeeded)
            .count()
    }

    /// Tasks that finished unsuccessfully.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Tasks that never reached a terminal state.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.reports.iter().filter(|r| !r.status.is_terminal()).count()
    }

    /// Failed tasks with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (TaskId, FailureReason)> + '_ {
        self.reports.iter().filter_map(|r| match r.status {
            TaskStatus::Failed(reason) => Some((r.task_id, reason)),
            _ => None,
        })
    }

    /// Report for a single task.
    #[must_use]
    pub fn report(&self, task_id: TaskId) -> Option<&TaskReport> {
        self.reports.iter().find(|r| r.task_id == task_id)
    }

    /// Whether every task is terminal.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending_count() == 0
    }
}

/// Point-in-time view of a scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SchedulerStats {
    /// Declared pool capacity.
    pub capacity: usize,
    /// Clients not retired.
    pub live_clients: usize,
    /// Clients idle in the pool.
    pub idle_clients: usize,
    /// Clients retired.
    pub retired_clients: usize,
    /// Execution units currently running.
    pub in_flight: usize,
    /// Tasks waiting in the queue.
    pub pending_tasks: usize,
    /// Tasks not yet terminal.
    pub remaining_tasks: usize,
}
