//! Builder assembling an [`EffortScheduler`] from clients, payloads and configuration.

use std::time::Duration;

use crate::config::{ExclusionPolicy, SchedulerConfig};
use crate::core::scheduler::SchedulerParts;
use crate::core::{AuditSink, EffortExecutor, EffortScheduler, SchedulerError};

/// Collects scheduler inputs and validates them on [`SchedulerBuilder::build`].
pub struct SchedulerBuilder<R, P> {
    clients: Vec<R>,
    payloads: Vec<P>,
    config: SchedulerConfig,
    audit: Option<Box<dyn AuditSink>>,
}

impl<R, P> Default for SchedulerBuilder<R, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, P> SchedulerBuilder<R, P> {
    /// Empty builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
            payloads: Vec::new(),
            config: SchedulerConfig::default(),
            audit: None,
        }
    }

    /// Append client handles. Ids follow insertion order.
    #[must_use]
    pub fn clients(mut self, clients: impl IntoIterator<Item = R>) -> Self {
        self.clients.extend(clients);
        self
    }

    /// Append task payloads. Ids follow insertion order.
    #[must_use]
    pub fn tasks(mut self, payloads: impl IntoIterator<Item = P>) -> Self {
        self.payloads.extend(payloads);
        self
    }

    /// Attempts budget for every task.
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.config.attempts = attempts;
        self
    }

    /// Behaviour once a task has failed on every live client.
    #[must_use]
    pub fn exclusion_policy(mut self, policy: ExclusionPolicy) -> Self {
        self.config.exclusion = policy;
        self
    }

    /// Log a stall warning whenever the dispatcher waits this long for a client.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout_ms =
            Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Worker threads for [`EffortScheduler::run_blocking`].
    #[must_use]
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = Some(threads);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Record lifecycle events into `sink`.
    #[must_use]
    pub fn audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Validate the configuration and build the scheduler.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` if the configuration does not validate.
    pub fn build<E>(self, executor: E) -> Result<EffortScheduler<R, P, E>, SchedulerError>
    where
        R: Send + 'static,
        P: Send + Sync + 'static,
        E: EffortExecutor<R, P>,
    {
        self.config.validate()?;
        let parts = SchedulerParts {
            clients: self.clients,
            payloads: self.payloads,
            attempts: self.config.attempts,
            policy: self.config.exclusion,
            acquire_timeout: self.config.acquire_timeout(),
            worker_threads: self.config.worker_threads_or_default(),
            audit: self.audit,
        };
        Ok(EffortScheduler::from_parts(parts, executor))
    }
}

impl<R, P> std::fmt::Debug for SchedulerBuilder<R, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerBuilder")
            .field("clients", &self.clients.len())
            .field("tasks", &self.payloads.len())
            .field("config", &self.config)
            .field("audit", &self.audit.is_some())
            .finish()
    }
}
