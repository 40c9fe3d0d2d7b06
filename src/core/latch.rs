//! Countdown gate that fires once when every task has finished.

use parking_lot::Mutex;
use tokio::sync::watch;

/// Shared countdown initialised to the task count.
///
/// Each terminal transition counts down once; reaching zero broadcasts the
/// completion signal to every waiter. The count never goes below zero.
pub struct CompletionLatch {
    remaining: Mutex<usize>,
    fired: watch::Sender<bool>,
}

impl CompletionLatch {
    /// Create a latch expecting `count` terminal transitions. A zero count is
    /// already fired.
    #[must_use]
    pub fn new(count: usize) -> Self {
        let (fired, _) = watch::channel(count == 0);
        Self {
            remaining: Mutex::new(count),
            fired,
        }
    }

    /// Count down once. Returns true for the call that brings the latch to zero.
    pub fn count_down(&self) -> bool {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            tracing::debug!("latch already at zero, ignoring count down");
            return false;
        }
        *remaining -= 1;
        if *remaining > 0 {
            return false;
        }
        drop(remaining);
        self.fired.send_replace(true);
        true
    }

    /// Transitions still outstanding.
    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    /// Whether the latch has reached zero.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        *self.fired.borrow()
    }

    /// Wait until the latch reaches zero.
    pub async fn wait(&self) {
        let mut rx = self.fired.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl std::fmt::Debug for CompletionLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionLatch")
            .field("remaining", &self.remaining())
            .finish()
    }
}
