//! Executor callback seam and attempt outcomes.

use async_trait::async_trait;

use crate::core::{Client, Task};

/// What a single attempt reports back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The task is done.
    Success,
    /// The attempt failed; try again on another client if budget remains.
    Retry,
    /// The client is unusable; retire it, then treat the attempt as `Retry`.
    Invalidate,
    /// The task can never succeed; fail it without further attempts.
    Fail,
}

/// Performs one attempt of a task against one checked-out client.
///
/// Domain errors (network failures, expired credentials, ...) are never seen
/// by the scheduler; the executor translates them into an [`Outcome`]. A
/// client can also be retired alongside a `Success` or `Fail` outcome by
/// calling [`Client::invalidate`].
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use retry_lot::core::{Client, EffortExecutor, Outcome, Task};
///
/// struct PageFetcher;
///
/// #[async_trait]
/// impl EffortExecutor<reqwest::Client, u32> for PageFetcher {
///     async fn execute(&self, client: &mut Client<reqwest::Client>, task: &Task<u32>) -> Outcome {
///         match fetch_page(client, *task.payload()).await {
///             Ok(_) => Outcome::Success,
///             Err(e) if e.is_banned() => Outcome::Invalidate,
///             Err(_) => Outcome::Retry,
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait EffortExecutor<R, P>: Send + Sync + 'static
where
    R: Send + 'static,
    P: Send + Sync + 'static,
{
    /// Run one attempt of `task` using `client`.
    async fn execute(&self, client: &mut Client<R>, task: &Task<P>) -> Outcome;
}

/// Adapter turning a synchronous closure into an [`EffortExecutor`].
#[derive(Clone)]
pub struct FnExecutor<F>(pub F);

#[async_trait]
impl<R, P, F> EffortExecutor<R, P> for FnExecutor<F>
where
    R: Send + 'static,
    P: Send + Sync + 'static,
    F: Fn(&mut Client<R>, &Task<P>) -> Outcome + Send + Sync + 'static,
{
    async fn execute(&self, client: &mut Client<R>, task: &Task<P>) -> Outcome {
        (self.0)(client, task)
    }
}
