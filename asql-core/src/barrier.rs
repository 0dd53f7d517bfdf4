//! Completion barriers.
//!
//! A [`CompletionBarrier`] counts operations that were dispatched but have
//! not yet delivered their outcome. A transaction owns one and waits on it
//! before it commits or rolls back; every operation dispatched under the
//! transaction, directly or through one of its prepared statements, holds a
//! [`BarrierGuard`] until its outcome has been sent.
//!
//! Guards are taken synchronously at dispatch time, before the task is
//! spawned, so a waiter never misses an operation that was requested but not
//! yet running. Dropping the guard leaves the barrier, which also happens
//! when the task panics.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tracing::{trace, warn};

/// A counter of in-flight operations that can be waited on until it drains.
#[derive(Debug, Default)]
pub struct CompletionBarrier {
    count: AtomicUsize,
    drained: Notify,
}

impl CompletionBarrier {
    /// Create an empty barrier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation.
    pub fn enter(&self) {
        let count = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(in_flight = count, "barrier enter");
    }

    /// Unregister an operation, waking waiters when the count reaches zero.
    ///
    /// Leaving an empty barrier is ignored.
    pub fn leave(&self) {
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match previous {
            Ok(1) => {
                trace!(in_flight = 0, "barrier drained");
                self.drained.notify_waiters();
            }
            Ok(n) => trace!(in_flight = n - 1, "barrier leave"),
            Err(_) => warn!("barrier leave without a matching enter"),
        }
    }

    /// Number of operations currently registered.
    pub fn in_flight(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Wait until no operation is registered.
    ///
    /// Returns immediately if the barrier is already empty.
    pub async fn wait(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register for the wakeup before reading the count, so a leave
            // between the check and the await is not lost.
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Register an operation, returning a guard that unregisters it on drop.
    pub fn guard(self: &Arc<Self>) -> BarrierGuard {
        self.enter();
        BarrierGuard {
            barriers: vec![Arc::clone(self)],
        }
    }
}

/// The barriers a dispatch site registers its operations with.
///
/// Connections participate in none. A transaction participates in its own
/// barrier. A prepared statement participates in its own barrier, which
/// its `close` waits on, and in its transaction's barrier when it was
/// prepared under one.
#[derive(Debug, Clone, Default)]
pub struct Participation {
    barriers: Vec<Arc<CompletionBarrier>>,
}

impl Participation {
    /// Participate in no barrier.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Participate in one barrier.
    pub fn shared(barrier: Arc<CompletionBarrier>) -> Self {
        Self {
            barriers: vec![barrier],
        }
    }

    /// Also participate in `barrier`.
    pub fn join(mut self, barrier: Arc<CompletionBarrier>) -> Self {
        self.barriers.push(barrier);
        self
    }

    /// Check if no barrier is involved.
    pub fn is_detached(&self) -> bool {
        self.barriers.is_empty()
    }

    /// Enter every barrier, returning a guard that leaves them on drop.
    pub fn enter(&self) -> BarrierGuard {
        for barrier in &self.barriers {
            barrier.enter();
        }
        BarrierGuard {
            barriers: self.barriers.clone(),
        }
    }
}

/// Leaves the barriers it was entered on when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard leaves the barrier immediately"]
pub struct BarrierGuard {
    barriers: Vec<Arc<CompletionBarrier>>,
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        for barrier in &self.barriers {
            barrier.leave();
        }
    }
}
