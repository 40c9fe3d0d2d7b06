//! Tokio runtime spawner implementation.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tokio::task::{AbortHandle, JoinSet};

use crate::core::SchedulerError;

/// Tokio-based spawner that places execution units on a runtime.
///
/// Built either from an existing handle or with its own multi-threaded
/// runtime, which it then keeps alive.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Handle,
    runtime: Option<Arc<Runtime>>,
}

impl TokioSpawner {
    /// Create a new `TokioSpawner` from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    /// Spawner for the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Runtime` when called outside a tokio runtime.
    pub fn current() -> Result<Self, SchedulerError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SchedulerError::Runtime(e.to_string()))
    }

    /// Create a `TokioSpawner` with a new multi-threaded runtime with specified worker threads.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Runtime` if the runtime cannot be built.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, SchedulerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("retry-lot-worker")
            .enable_all()
            .build()
            .map_err(|e| SchedulerError::Runtime(e.to_string()))?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Handle of the underlying runtime.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn `fut` into `set` on this spawner's runtime.
    pub fn spawn_into<F>(&self, set: &mut JoinSet<()>, fut: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        set.spawn_on(fut, &self.handle)
    }

    /// Drive `fut` to completion on the owned runtime.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Runtime` if this spawner does not own its runtime or
    /// the caller is already inside a runtime.
    pub fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, SchedulerError> {
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(SchedulerError::Runtime(
                "spawner does not own a runtime".into(),
            ));
        };
        if Handle::try_current().is_ok() {
            return Err(SchedulerError::Runtime(
                "cannot block inside an async context".into(),
            ));
        }
        Ok(runtime.block_on(fut))
    }
}

impl std::fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("owns_runtime", &self.runtime.is_some())
            .finish()
    }
}
