//! Bounded FIFO of pending tasks awaiting dispatch.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::core::{SchedulerError, Task};

/// Pending-task queue sized at construction.
///
/// Capacity equals the task count of a run, and a task is never queued twice,
/// so `enqueue` only fails on misuse.
pub struct TaskQueue<P> {
    max_depth: usize,
    tasks: Mutex<VecDeque<Arc<Task<P>>>>,
    available: Notify,
}

impl<P> TaskQueue<P> {
    /// Create an empty queue holding at most `max_depth` tasks.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            tasks: Mutex::new(VecDeque::with_capacity(max_depth)),
            available: Notify::new(),
        }
    }

    /// Append a task.
    ///
    /// # Errors
    ///
    /// `SchedulerError::QueueFull` if the queue already holds `max_depth` tasks.
    pub fn enqueue(&self, task: Arc<Task<P>>) -> Result<(), SchedulerError> {
        {
            let mut tasks = self.tasks.lock();
            if tasks.len() >= self.max_depth {
                return Err(SchedulerError::QueueFull("max queue depth reached".into()));
            }
            tasks.push_back(task);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Pop the oldest task without waiting.
    pub fn try_dequeue(&self) -> Option<Arc<Task<P>>> {
        self.tasks.lock().pop_front()
    }

    /// Pop the oldest task, waiting until one is enqueued.
    ///
    /// Cancel safe: a task is only removed when the future completes.
    pub async fn dequeue(&self) -> Arc<Task<P>> {
        loop {
            if let Some(task) = self.try_dequeue() {
                return task;
            }
            // notify_one stores a permit, so an enqueue between the check and
            // this await still wakes us.
            self.available.notified().await;
        }
    }

    /// Remove the oldest task for which `pick` returns a value, scanning in
    /// queue order under the queue lock. Tasks ahead of it keep their place.
    pub fn take_first<T, F>(&self, mut pick: F) -> Option<(Arc<Task<P>>, T)>
    where
        F: FnMut(&Task<P>) -> Option<T>,
    {
        let mut tasks = self.tasks.lock();
        let (pos, picked) = tasks
            .iter()
            .enumerate()
            .find_map(|(pos, task)| pick(task).map(|picked| (pos, picked)))?;
        let task = tasks.remove(pos)?;
        Some((task, picked))
    }

    /// Resolves on the next enqueue. A wakeup with no waiter is kept for the
    /// next call.
    pub(crate) fn changed(&self) -> Notified<'_> {
        self.available.notified()
    }

    /// Maximum depth allowed for this queue.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether no task is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}
