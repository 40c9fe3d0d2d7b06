//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Every client has been retired while tasks are still pending.
    #[error("resource exhausted: {pending} task(s) pending with no usable clients")]
    ResourceExhausted {
        /// Tasks that had not reached a terminal state when the run stopped.
        pending: usize,
    },
    /// Queue is full.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// No client became available within the requested timeout.
    #[error("acquire timed out")]
    Timeout,
    /// The pool was closed while waiting.
    #[error("pool has been shut down")]
    Shutdown,
    /// `run` was invoked while another run was still dispatching.
    #[error("scheduler is already running")]
    AlreadyRunning,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The tokio runtime could not be built or entered.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
