//! Bounded pool of reusable client handles with async checkout and retirement.
//!
//! Every handle handed to [`ClientPool::new`] stays in circulation for the
//! lifetime of the pool: it is either idle, checked out by exactly one
//! execution unit, or retired. Retired handles are parked inside the pool and
//! never returned by any acquire call again.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::core::SchedulerError;

/// Stable identifier of a client, assigned from its position at construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ClientId(pub usize);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// A checked-out client handle.
///
/// Dereferences to the wrapped handle. A callback that discovers the handle is
/// unusable (banned proxy, revoked credentials, ...) calls [`Client::invalidate`];
/// the scheduler then retires it instead of returning it to the pool.
#[derive(Debug)]
pub struct Client<R> {
    id: ClientId,
    inner: R,
    invalidated: bool,
}

impl<R> Client<R> {
    fn new(id: ClientId, inner: R) -> Self {
        Self {
            id,
            inner,
            invalidated: false,
        }
    }

    /// Identifier of this client.
    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Mark this client for retirement once the current attempt finishes.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Whether [`Client::invalidate`] was called.
    #[must_use]
    pub const fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Borrow the wrapped handle.
    #[must_use]
    pub const fn get(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the wrapped handle.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R> Deref for Client<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.inner
    }
}

impl<R> DerefMut for Client<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

/// Result of a filtered acquire.
#[derive(Debug)]
pub enum Eligibility<R> {
    /// An eligible idle client was checked out.
    Acquired(Client<R>),
    /// Every live client is rejected by the filter; waiting would never succeed.
    AllExcluded,
}

/// Snapshot of which live clients pass a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// No live clients remain.
    NoClients,
    /// Live clients exist but the filter rejects all of them.
    AllExcluded,
    /// At least one live client passes the filter.
    Available,
}

struct PoolState<R> {
    idle: VecDeque<Client<R>>,
    /// Ids of every non-retired client, idle or checked out.
    live: BTreeSet<ClientId>,
    retired: Vec<Client<R>>,
    closed: bool,
}

/// Pool of client handles with a fixed capacity.
pub struct ClientPool<R> {
    capacity: usize,
    state: Mutex<PoolState<R>>,
    /// Signaled whenever a client is released or retired, or the pool closes.
    changed: Notify,
}

impl<R> ClientPool<R> {
    /// Create a pool owning `handles`. Capacity is fixed to `handles.len()`.
    pub fn new(handles: impl IntoIterator<Item = R>) -> Self {
        let idle: VecDeque<_> = handles
            .into_iter()
            .enumerate()
            .map(|(idx, inner)| Client::new(ClientId(idx), inner))
            .collect();
        let live = idle.iter().map(Client::id).collect();
        Self {
            capacity: idle.len(),
            state: Mutex::new(PoolState {
                idle,
                live,
                retired: Vec::new(),
                closed: false,
            }),
            changed: Notify::new(),
        }
    }

    /// Declared capacity; never changes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clients that have not been retired (idle or checked out).
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Clients currently idle in the pool.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Clients permanently removed from circulation.
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.state.lock().retired.len()
    }

    /// Ids of retired clients, in retirement order.
    #[must_use]
    pub fn retired_ids(&self) -> Vec<ClientId> {
        self.state.lock().retired.iter().map(Client::id).collect()
    }

    /// Check out any idle client without waiting.
    pub fn try_acquire(&self) -> Option<Client<R>> {
        self.state.lock().idle.pop_front()
    }

    /// Check out any idle client, waiting for one to be released.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::ResourceExhausted` once every client is retired
    /// - `SchedulerError::Shutdown` if the pool is closed
    pub async fn acquire(&self) -> Result<Client<R>, SchedulerError> {
        match self.acquire_eligible(|_| true).await? {
            Eligibility::Acquired(client) => Ok(client),
            // Unreachable with an accept-all filter and live clients present.
            Eligibility::AllExcluded => Err(SchedulerError::ResourceExhausted { pending: 0 }),
        }
    }

    /// [`ClientPool::acquire`] bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Timeout` if nothing became idle in time, otherwise as
    /// [`ClientPool::acquire`].
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Client<R>, SchedulerError> {
        tokio::time::timeout(timeout, self.acquire())
            .await
            .map_err(|_| SchedulerError::Timeout)?
    }

    /// Check out the first idle client accepted by `eligible`, waiting while
    /// every accepted client is busy.
    ///
    /// Rejected idle clients are skipped in place, so no rejected client is
    /// ever handed out. Returns [`Eligibility::AllExcluded`] as soon as no live
    /// client is accepted.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::ResourceExhausted` once every client is retired
    /// - `SchedulerError::Shutdown` if the pool is closed
    pub async fn acquire_eligible<F>(&self, eligible: F) -> Result<Eligibility<R>, SchedulerError>
    where
        F: Fn(ClientId) -> bool,
    {
        loop {
            let notified = self.changed();
            tokio::pin!(notified);
            // Register before inspecting state so a concurrent release is not lost.
            notified.as_mut().enable();

            if let Some(found) = self.try_acquire_eligible(&eligible)? {
                return Ok(found);
            }
            notified.await;
        }
    }

    /// Non-blocking [`ClientPool::acquire_eligible`]. `Ok(None)` means every
    /// accepted client is live but checked out.
    ///
    /// # Errors
    ///
    /// As [`ClientPool::acquire_eligible`].
    pub fn try_acquire_eligible<F>(
        &self,
        eligible: F,
    ) -> Result<Option<Eligibility<R>>, SchedulerError>
    where
        F: Fn(ClientId) -> bool,
    {
        let mut state = self.state.lock();
        if state.live.is_empty() {
            return Err(SchedulerError::ResourceExhausted { pending: 0 });
        }
        if state.closed {
            return Err(SchedulerError::Shutdown);
        }
        if let Some(pos) = state.idle.iter().position(|c| eligible(c.id)) {
            if let Some(client) = state.idle.remove(pos) {
                return Ok(Some(Eligibility::Acquired(client)));
            }
        }
        if state.live.iter().any(|id| eligible(*id)) {
            Ok(None)
        } else {
            Ok(Some(Eligibility::AllExcluded))
        }
    }

    /// Resolves on the next release, retirement or close. Enable it before
    /// inspecting the pool.
    pub(crate) fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }

    /// Classify the live clients against `eligible` without checking anything out.
    pub fn coverage<F>(&self, eligible: F) -> Coverage
    where
        F: Fn(ClientId) -> bool,
    {
        let state = self.state.lock();
        if state.live.is_empty() {
            Coverage::NoClients
        } else if state.live.iter().any(|id| eligible(*id)) {
            Coverage::Available
        } else {
            Coverage::AllExcluded
        }
    }

    /// Return a client to the idle set. Invalidated clients are retired instead.
    pub fn release(&self, client: Client<R>) {
        if client.is_invalidated() {
            self.retire(client);
            return;
        }
        self.state.lock().idle.push_back(client);
        self.changed.notify_waiters();
    }

    /// Permanently remove a client from circulation.
    pub fn retire(&self, mut client: Client<R>) {
        client.invalidated = true;
        let remaining = {
            let mut state = self.state.lock();
            state.live.remove(&client.id);
            state.retired.push(client);
            state.live.len()
        };
        if remaining == 0 {
            tracing::warn!("last live client retired");
        }
        self.changed.notify_waiters();
    }

    /// Close the pool, failing every pending and future acquire.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.changed.notify_waiters();
    }
}

impl<R> fmt::Debug for ClientPool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClientPool")
            .field("capacity", &self.capacity)
            .field("idle", &state.idle.len())
            .field("live", &state.live.len())
            .field("retired", &state.retired.len())
            .field("closed", &state.closed)
            .finish()
    }
}
