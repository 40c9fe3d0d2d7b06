//! Dispatcher pairing pending tasks with idle clients.
//!
//! One control loop scans the pending queue for the oldest task with an idle
//! client it has not already failed on, and spawns an execution unit for the
//! pair without waiting for it. A task whose eligible clients are all busy
//! stays queued and does not hold up the tasks behind it. Each unit runs the
//! executor, returns or retires its client, and either requeues the task or
//! moves it to a terminal state. The loop stops when the completion latch
//! fires or when no usable client remains. Every spawned unit finishes before
//! `run` returns, and the pool is closed afterwards.
//!
//! # Design
//!
//! - **Bounded concurrency**: a unit owns exactly one client, so at most
//!   `capacity` units run at once
//! - **Lock order**: queue lock, then pool lock, then task lock
//! - **Cancellation**: dropping the `run` future detaches running units; they
//!   still release their clients and requeue or finish their tasks
//! - **No lost tasks**: a panicking executor is caught and counted as an
//!   invalidating attempt

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ExclusionPolicy;
use crate::core::audit::build_audit_event;
use crate::core::{
    AuditAction, AuditSink, Client, ClientId, ClientPool, CompletionLatch, Coverage,
    EffortExecutor, Eligibility, FailureReason, Outcome, RunSummary, SchedulerError,
    SchedulerStats, Task, TaskId, TaskQueue, TaskReport, TaskStatus,
};
use crate::runtime::TokioSpawner;

/// State shared between the dispatcher and its execution units.
struct Shared<R, P, E> {
    run_id: Uuid,
    pool: ClientPool<R>,
    queue: TaskQueue<P>,
    latch: CompletionLatch,
    executor: E,
    policy: ExclusionPolicy,
    in_flight: AtomicUsize,
    /// Spawned units not yet finished, across runs.
    units: AtomicUsize,
    units_idle: Notify,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
}

/// Runs a fixed set of retryable tasks against a fixed pool of clients.
///
/// # Example
///
/// ```rust,ignore
/// use retry_lot::core::{EffortScheduler, FnExecutor, Outcome};
///
/// let scheduler = EffortScheduler::new(
///     vec![http_a, http_b],
///     (1..=10).collect::<Vec<u32>>(),
///     3,
///     FnExecutor(|client, task| fetch(client, *task.payload())),
/// )?;
/// let summary = scheduler.run().await?;
/// assert!(summary.is_complete());
/// ```
pub struct EffortScheduler<R, P, E> {
    shared: Arc<Shared<R, P, E>>,
    tasks: Vec<Arc<Task<P>>>,
    acquire_timeout: Option<Duration>,
    worker_threads: usize,
    running: AtomicBool,
}

/// Clears the running flag even if the run future is dropped early.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Construction parameters assembled by the builder.
pub(crate) struct SchedulerParts<R, P> {
    pub clients: Vec<R>,
    pub payloads: Vec<P>,
    pub attempts: u32,
    pub policy: ExclusionPolicy,
    pub acquire_timeout: Option<Duration>,
    pub worker_threads: usize,
    pub audit: Option<Box<dyn AuditSink>>,
}

impl<R, P, E> EffortScheduler<R, P, E>
where
    R: Send + 'static,
    P: Send + Sync + 'static,
    E: EffortExecutor<R, P>,
{
    /// Create a scheduler with default settings.
    ///
    /// Use [`crate::builders::SchedulerBuilder`] for the exclusion policy,
    /// stall warnings, worker threads and auditing.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` if `attempts` is zero.
    pub fn new(
        clients: impl IntoIterator<Item = R>,
        payloads: impl IntoIterator<Item = P>,
        attempts: u32,
        executor: E,
    ) -> Result<Self, SchedulerError> {
        crate::builders::SchedulerBuilder::new()
            .clients(clients)
            .tasks(payloads)
            .attempts(attempts)
            .build(executor)
    }

    pub(crate) fn from_parts(parts: SchedulerParts<R, P>, executor: E) -> Self {
        let task_count = parts.payloads.len();
        let queue = TaskQueue::new(task_count);
        let tasks: Vec<_> = parts
            .payloads
            .into_iter()
            .enumerate()
            .map(|(idx, payload)| Arc::new(Task::new(TaskId(idx), payload, parts.attempts)))
            .collect();
        for task in &tasks {
            // Capacity equals the task count, so seeding cannot overflow.
            let _ = queue.enqueue(Arc::clone(task));
        }

        let shared = Shared {
            run_id: Uuid::new_v4(),
            pool: ClientPool::new(parts.clients),
            queue,
            latch: CompletionLatch::new(task_count),
            executor,
            policy: parts.policy,
            in_flight: AtomicUsize::new(0),
            units: AtomicUsize::new(0),
            units_idle: Notify::new(),
            audit: parts.audit.map(Mutex::new),
        };

        Self {
            shared: Arc::new(shared),
            tasks,
            acquire_timeout: parts.acquire_timeout,
            worker_threads: parts.worker_threads,
            running: AtomicBool::new(false),
        }
    }

    /// Identifier used in logs and audit events for this scheduler's run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.shared.run_id
    }

    /// The client pool.
    #[must_use]
    pub fn pool(&self) -> &ClientPool<R> {
        &self.shared.pool
    }

    /// Look up a task by id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task<P>> {
        self.tasks.get(id.0).map(|t| &**t)
    }

    /// All tasks in id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task<P>> + '_ {
        self.tasks.iter().map(|t| &**t)
    }

    /// Per-task reports as of now.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.shared.run_id,
            reports: self.tasks.iter().map(|t| TaskReport::from_task(&**t)).collect(),
            retired_clients: self.shared.pool.retired_ids(),
        }
    }

    /// Live counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let shared = &self.shared;
        SchedulerStats {
            capacity: shared.pool.capacity(),
            live_clients: shared.pool.live_count(),
            idle_clients: shared.pool.idle_count(),
            retired_clients: shared.pool.retired_count(),
            in_flight: shared.in_flight.load(Ordering::Acquire),
            pending_tasks: shared.queue.len(),
            remaining_tasks: shared.latch.remaining(),
        }
    }

    /// Run every task to a terminal state on the current tokio runtime.
    ///
    /// Returns once the completion latch fires and every execution unit has
    /// been joined, then closes the pool. Calling it again after completion
    /// returns the same summary.
    ///
    /// Dropping the returned future stops dispatching but lets running attempts
    /// finish. A later call picks up the remaining tasks.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::ResourceExhausted` if every client was retired while
    ///   tasks were still pending
    /// - `SchedulerError::AlreadyRunning` if another run is in progress
    /// - `SchedulerError::Runtime` when called outside a tokio runtime
    pub async fn run(&self) -> Result<RunSummary, SchedulerError> {
        let spawner = TokioSpawner::current()?;
        self.run_with(&spawner).await
    }

    /// Blocking variant of [`EffortScheduler::run`] on a dedicated runtime.
    ///
    /// # Errors
    ///
    /// As [`EffortScheduler::run`]; additionally `SchedulerError::Runtime` if
    /// called from inside an async context.
    pub fn run_blocking(&self) -> Result<RunSummary, SchedulerError> {
        // A runtime must not be built, and then dropped, on a runtime thread.
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(SchedulerError::Runtime(
                "run_blocking called from inside an async context".into(),
            ));
        }
        let spawner = TokioSpawner::with_worker_threads(self.worker_threads)?;
        spawner.block_on(self.run_with(&spawner))?
    }

    async fn run_with(&self, spawner: &TokioSpawner) -> Result<RunSummary, SchedulerError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(SchedulerError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);
        let span = info_span!("run", run_id = %self.shared.run_id);
        self.dispatch(spawner).instrument(span).await
    }

    async fn dispatch(&self, spawner: &TokioSpawner) -> Result<RunSummary, SchedulerError> {
        let shared = &self.shared;
        info!(
            tasks = self.tasks.len(),
            clients = shared.pool.capacity(),
            policy = ?shared.policy,
            "run started"
        );

        let mut units = UnitSet(JoinSet::new());
        let stall = self.acquire_timeout.unwrap_or(Duration::MAX);
        let stopped = loop {
            while let Some(joined) = units.0.try_join_next() {
                log_join(joined);
            }
            if shared.latch.is_fired() {
                break Ok(());
            }

            let queue_changed = shared.queue.changed();
            let pool_changed = shared.pool.changed();
            tokio::pin!(queue_changed, pool_changed);
            // Register before scanning so an enqueue or release is not lost.
            queue_changed.as_mut().enable();
            pool_changed.as_mut().enable();

            // First queued task with a usable client. Tasks whose eligible
            // clients are all busy stay queued in place.
            let picked = shared.queue.take_first(|task| {
                shared
                    .pool
                    .try_acquire_eligible(|id| !task.is_excluded(id))
                    .transpose()
            });

            match picked {
                Some((task, Ok(Eligibility::Acquired(client)))) => {
                    self.launch(spawner, &mut units, task, client);
                }
                Some((task, Ok(Eligibility::AllExcluded))) => match shared.policy {
                    ExclusionPolicy::Recycle => {
                        debug!(task_id = %task.id(), "every live client excluded, recycling");
                        task.clear_exclusions();
                        if let Err(e) = shared.queue.enqueue(task) {
                            error!(error = %e, "failed to return task to queue");
                        }
                    }
                    ExclusionPolicy::Exhaust => {
                        shared.finish(&task, TaskStatus::Failed(FailureReason::ExclusionExhausted));
                    }
                },
                Some((task, Err(err))) => {
                    if let Err(e) = shared.queue.enqueue(task) {
                        error!(error = %e, "failed to return task to queue");
                    }
                    break Err(err);
                }
                None => tokio::select! {
                    biased;
                    () = shared.latch.wait() => break Ok(()),
                    () = queue_changed.as_mut() => {}
                    () = pool_changed.as_mut() => {}
                    () = tokio::time::sleep(stall), if self.acquire_timeout.is_some() => {
                        warn!(
                            waited_ms = u64::try_from(stall.as_millis()).unwrap_or(u64::MAX),
                            pending = shared.queue.len(),
                            idle = shared.pool.idle_count(),
                            live = shared.pool.live_count(),
                            in_flight = shared.in_flight.load(Ordering::Acquire),
                            "no eligible client yet, still waiting"
                        );
                    }
                },
            }
        };

        while let Some(joined) = units.0.join_next().await {
            log_join(joined);
        }
        // Units detached by an earlier cancelled run are not in this set.
        shared.units_finished().await;
        shared.pool.close();

        let summary = self.summary();
        match stopped {
            Ok(()) => {}
            // Units still running at the stop may have finished the remaining tasks.
            Err(SchedulerError::ResourceExhausted { .. }) if shared.latch.is_fired() => {}
            Err(SchedulerError::ResourceExhausted { .. }) => {
                let pending = summary.pending_count();
                warn!(pending, "no usable clients remain, stopping dispatch");
                shared.record(
                    None,
                    None,
                    AuditAction::Exhausted,
                    Some(format!("{pending} task(s) pending")),
                );
                return Err(SchedulerError::ResourceExhausted { pending });
            }
            Err(err) => return Err(err),
        }

        info!(
            succeeded = summary.succeeded_count(),
            failed = summary.failed_count(),
            retired_clients = summary.retired_clients.len(),
            "run finished"
        );
        Ok(summary)
    }

    /// Start one attempt of `task` on `client` without waiting for it.
    fn launch(
        &self,
        spawner: &TokioSpawner,
        units: &mut UnitSet,
        task: Arc<Task<P>>,
        client: Client<R>,
    ) {
        let shared = &self.shared;
        let client_id = client.id();
        if !task.mark_executing(client_id) {
            warn!(task_id = %task.id(), "queued task was not pending, skipping");
            shared.pool.release(client);
            return;
        }
        shared.in_flight.fetch_add(1, Ordering::AcqRel);
        shared.units.fetch_add(1, Ordering::AcqRel);
        debug!(
            task_id = %task.id(),
            client_id = %client_id,
            attempt = task.attempts_made(),
            "dispatching task"
        );
        shared.record(Some(task.id()), Some(client_id), AuditAction::Dispatch, None);

        let unit = execute_unit(UnitToken(Arc::clone(shared)), task, client)
            .instrument(tracing::Span::current());
        spawner.spawn_into(&mut units.0, unit);
    }
}

/// Execution units of one run. Dropping the set, as when the `run` future
/// is cancelled, detaches the units instead of aborting them, so every
/// checked-out client and executing task is still returned.
struct UnitSet(JoinSet<()>);

impl Drop for UnitSet {
    fn drop(&mut self) {
        self.0.detach_all();
    }
}

/// Held by a spawned unit for its whole life.
struct UnitToken<R, P, E>(Arc<Shared<R, P, E>>);

impl<R, P, E> Drop for UnitToken<R, P, E> {
    fn drop(&mut self) {
        if self.0.units.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.units_idle.notify_waiters();
        }
    }
}

impl<R, P, E> Shared<R, P, E> {
    /// Wait until no spawned unit is left running.
    async fn units_finished(&self) {
        loop {
            let idle = self.units_idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.units.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn record(
        &self,
        task_id: Option<TaskId>,
        client_id: Option<ClientId>,
        action: AuditAction,
        detail: Option<String>,
    ) {
        if let Some(audit) = self.audit.as_ref() {
            audit
                .lock()
                .record(build_audit_event(self.run_id, task_id, client_id, action, detail));
        }
    }

    /// Terminal transition plus latch count down, at most once per task.
    fn finish(&self, task: &Task<P>, status: TaskStatus) {
        if !task.finish(status) {
            debug!(task_id = %task.id(), "task already terminal, ignoring");
            return;
        }
        match status {
            TaskStatus::Failed(reason) => {
                info!(
                    task_id = %task.id(),
                    %reason,
                    attempts_made = task.attempts_made(),
                    attempts_left = task.attempts_left(),
                    "task failed"
                );
                self.record(Some(task.id()), None, AuditAction::Fail, Some(reason.to_string()));
            }
            _ => {
                info!(task_id = %task.id(), attempts_made = task.attempts_made(), "task succeeded");
                self.record(Some(task.id()), None, AuditAction::Succeed, None);
            }
        }
        if self.latch.count_down() {
            info!("all tasks terminal");
        }
    }

    fn requeue(&self, task: Arc<Task<P>>) {
        if !task.requeue() {
            return;
        }
        debug!(task_id = %task.id(), attempts_left = task.attempts_left(), "requeueing task");
        self.record(Some(task.id()), None, AuditAction::Requeue, None);
        if let Err(e) = self.queue.enqueue(task) {
            error!(error = %e, "failed to requeue task");
        }
    }

    /// Bookkeeping after `Retry`, `Invalidate` or a panic on `client_id`.
    fn on_failed_attempt(&self, task: Arc<Task<P>>, client_id: ClientId) {
        let left = task.record_failed_attempt(client_id);
        if left == 0 {
            self.finish(&task, TaskStatus::Failed(FailureReason::AttemptsExhausted));
            return;
        }
        match self.pool.coverage(|id| !task.is_excluded(id)) {
            // With no live clients the dispatcher reports exhaustion.
            Coverage::Available | Coverage::NoClients => self.requeue(task),
            Coverage::AllExcluded => match self.policy {
                ExclusionPolicy::Exhaust => {
                    self.finish(&task, TaskStatus::Failed(FailureReason::ExclusionExhausted));
                }
                ExclusionPolicy::Recycle => {
                    task.clear_exclusions();
                    self.requeue(task);
                }
            },
        }
    }
}

/// One attempt of `task` on `client`.
async fn execute_unit<R, P, E>(unit: UnitToken<R, P, E>, task: Arc<Task<P>>, mut client: Client<R>)
where
    R: Send + 'static,
    P: Send + Sync + 'static,
    E: EffortExecutor<R, P>,
{
    let shared = &unit.0;
    let client_id = client.id();
    let attempt = AssertUnwindSafe(shared.executor.execute(&mut client, &task))
        .catch_unwind()
        .await;
    let outcome = attempt.unwrap_or_else(|_| {
        error!(task_id = %task.id(), client_id = %client_id, "executor panicked");
        Outcome::Invalidate
    });
    debug!(task_id = %task.id(), client_id = %client_id, ?outcome, "attempt finished");

    if outcome == Outcome::Invalidate {
        client.invalidate();
    }
    // Leave the in-flight count before the client becomes available again.
    shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    if client.is_invalidated() {
        warn!(task_id = %task.id(), client_id = %client_id, "retiring client");
        shared.record(Some(task.id()), Some(client_id), AuditAction::Retire, None);
        shared.pool.retire(client);
    } else {
        shared.record(Some(task.id()), Some(client_id), AuditAction::Release, None);
        shared.pool.release(client);
    }

    match outcome {
        Outcome::Success => shared.finish(&task, TaskStatus::Succeeded),
        Outcome::Fail => shared.finish(&task, TaskStatus::Failed(FailureReason::Rejected)),
        Outcome::Retry | Outcome::Invalidate => shared.on_failed_attempt(task, client_id),
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "execution unit failed to join");
    }
}
