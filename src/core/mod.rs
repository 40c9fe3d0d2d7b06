//! Core scheduling abstractions: client pool, tasks, completion latch and dispatcher.

pub mod audit;
pub mod client_pool;
pub mod error;
pub mod executor;
pub mod latch;
pub mod scheduler;
pub mod summary;
pub mod task;
pub mod task_queue;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use client_pool::{Client, ClientId, ClientPool, Coverage, Eligibility};
pub use error::{AppResult, SchedulerError};
pub use executor::{EffortExecutor, FnExecutor, Outcome};
pub use latch::CompletionLatch;
pub use scheduler::EffortScheduler;
pub use summary::{RunSummary, SchedulerStats, TaskReport};
pub use task::{FailureReason, Task, TaskId, TaskStatus};
pub use task_queue::TaskQueue;
