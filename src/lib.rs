//! # Retry Lot
//!
//! A bounded, retry-aware scheduler that runs a fixed set of tasks against a
//! fixed pool of interchangeable clients.
//!
//! Each client (an HTTP session, a proxy, an API credential, a device handle)
//! can serve one task at a time. The scheduler pairs pending tasks with idle
//! clients, runs a user supplied executor for every pair, and decides from the
//! reported [`core::Outcome`] whether the task is finished, should be retried
//! on a different client, or whether the client itself is broken and must be
//! retired.
//!
//! ## Key Features
//!
//! - **Bounded Concurrency**: never more attempts in flight than live clients
//! - **Retry Budgets**: every task carries an attempts budget
//! - **Client Exclusion**: a task is never retried on a client it already failed on
//! - **Client Retirement**: broken clients leave the pool for good
//! - **Completion Latch**: `run` returns once every task is terminal, or fails
//!   with `ResourceExhausted` when no usable client remains
//!
//! ## Example
//!
//! ```rust,ignore
//! use retry_lot::builders::SchedulerBuilder;
//! use retry_lot::config::ExclusionPolicy;
//! use retry_lot::core::{FnExecutor, Outcome};
//!
//! let scheduler = SchedulerBuilder::new()
//!     .clients(proxies)
//!     .tasks(urls)
//!     .attempts(3)
//!     .exclusion_policy(ExclusionPolicy::Exhaust)
//!     .build(FnExecutor(|proxy, task| crawl(proxy, task.payload())))?;
//!
//! let summary = scheduler.run().await?;
//! for (task_id, reason) in summary.failures() {
//!     tracing::warn!(%task_id, %reason, "gave up");
//! }
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: clients, tasks, latch and dispatcher.
pub mod core;
/// Configuration models for attempts, exclusion and runtime settings.
pub mod config;
/// Builders to construct schedulers from inputs and configuration.
pub mod builders;
/// Tokio runtime adapter used to spawn execution units.
pub mod runtime;
/// Shared utilities.
pub mod util;
