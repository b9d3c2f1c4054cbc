//! Waiting for the engine to show up.
//!
//! A [`ReadinessGate`] polls an [`EngineSlot`] until the engine appears or a
//! timeout passes. The first wait is memoized: concurrent and later callers
//! attach to the same future instead of starting their own polling loops.
//!
//! What happens after a wait times out is a [`TimeoutPolicy`]. Under
//! [`TimeoutPolicy::Sticky`] the failed wait stays memoized, so every caller
//! sees the same timeout until [`ReadinessGate::reset`] is called. Under
//! [`TimeoutPolicy::Retry`] the failed wait is dropped and the next caller
//! starts a fresh one. Either way a populated slot is returned immediately.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::consts::POLL_INTERVAL;
use crate::engine::{EngineHandle, EngineSlot, EngineTimeout};

type WaitResult = Result<Arc<dyn EngineHandle>, EngineTimeout>;
type EngineWait = Shared<BoxFuture<'static, WaitResult>>;

/// What a timed-out wait means for later callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Keep the failed wait. Later callers get the same timeout.
    Sticky,
    /// Drop the failed wait. The next caller polls again.
    #[default]
    Retry,
}

pub struct ReadinessGate {
    slot: Arc<EngineSlot>,
    policy: TimeoutPolicy,
    poll_interval: Duration,
    /// The memoized wait, tagged with the generation that created it.
    pending: Mutex<Option<(u64, EngineWait)>>,
    waits_started: AtomicU64,
}

impl ReadinessGate {
    pub fn new(slot: Arc<EngineSlot>) -> Self {
        Self {
            slot,
            policy: TimeoutPolicy::default(),
            poll_interval: POLL_INTERVAL,
            pending: Mutex::new(None),
            waits_started: AtomicU64::new(0),
        }
    }

    pub fn with_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn slot(&self) -> &Arc<EngineSlot> {
        &self.slot
    }

    /// How many polling loops this gate has created.
    pub fn waits_started(&self) -> u64 {
        self.waits_started.load(Ordering::SeqCst)
    }

    /// Wait until the engine is available.
    ///
    /// `timeout` only applies when this call creates the wait; callers that
    /// attach to an outstanding wait inherit its deadline.
    pub async fn await_engine(&self, timeout: Duration) -> WaitResult {
        if let Some(engine) = self.slot.get() {
            return Ok(engine);
        }

        let (generation, wait) = self.shared_wait(timeout);
        let result = wait.await;

        if let Err(err) = &result {
            tracing::warn!(error = %err, policy = ?self.policy, "engine wait timed out");
            if self.policy == TimeoutPolicy::Retry {
                self.discard(generation);
            }
        }
        result
    }

    /// Forget the memoized wait so the next caller starts a new one.
    pub fn reset(&self) {
        *self.lock_pending() = None;
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<(u64, EngineWait)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn shared_wait(&self, timeout: Duration) -> (u64, EngineWait) {
        let mut pending = self.lock_pending();
        if let Some((generation, wait)) = pending.as_ref() {
            return (*generation, wait.clone());
        }

        let generation = self.waits_started.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, timeout_ms = timeout.as_millis() as u64, "waiting for engine");
        let wait = poll_slot(Arc::clone(&self.slot), self.poll_interval, timeout)
            .boxed()
            .shared();
        *pending = Some((generation, wait.clone()));
        (generation, wait)
    }

    /// Drop the memoized wait, unless someone already replaced it.
    fn discard(&self, generation: u64) {
        let mut pending = self.lock_pending();
        if pending.as_ref().is_some_and(|(g, _)| *g == generation) {
            *pending = None;
        }
    }
}

async fn poll_slot(slot: Arc<EngineSlot>, interval: Duration, timeout: Duration) -> WaitResult {
    let start = Instant::now();
    loop {
        if let Some(engine) = slot.get() {
            tracing::debug!(waited_ms = start.elapsed().as_millis() as u64, "engine ready");
            return Ok(engine);
        }
        if start.elapsed() > timeout {
            return Err(EngineTimeout { waited: timeout });
        }
        tokio::time::sleep(interval).await;
    }
}
