//! Asynchronous dispatch of synchronous driver calls.
//!
//! Every execute or query call goes through [`Dispatcher::dispatch`]:
//!
//! 1. a child context is derived from the caller's context;
//! 2. the dispatch site's barriers are entered, before anything is spawned;
//! 3. the driver call runs on the runtime's blocking pool;
//! 4. its outcome is sent on a single-use channel;
//! 5. the barriers are left, after the send.
//!
//! The caller gets an [`OperationFuture`] and a [`CancelHandle`] back without
//! waiting. The channel holds its one value without a receiver being ready,
//! so a caller that cancels and then drops the future never strands the task
//! or the barrier slot.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::future::FusedFuture;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::barrier::{CompletionBarrier, Participation};
use crate::context::{CancelHandle, Context};
use crate::error::{DriverError, DriverResult};
use crate::result::{ExecResult, RowSet, SingleRow};

/// An operation outcome that can stand in for a task that never delivered.
pub trait Outcome: Send + 'static {
    /// The outcome reported when the task ended without sending one.
    fn aborted() -> Self;
}

/// The single-use future of one dispatched operation.
///
/// Resolves exactly once with the operation's outcome. Dropping it is safe at
/// any point; the task still runs to completion and releases its barriers.
#[derive(Debug)]
#[must_use = "the outcome of the operation is only observable through this future"]
pub struct OperationFuture<T> {
    rx: oneshot::Receiver<T>,
    terminated: bool,
}

impl<T> OperationFuture<T> {
    fn new(rx: oneshot::Receiver<T>) -> Self {
        Self {
            rx,
            terminated: false,
        }
    }
}

impl<T: Outcome> Future for OperationFuture<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<T> {
        let this = &mut *self;
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => {
                this.terminated = true;
                Poll::Ready(outcome)
            }
            Poll::Ready(Err(_)) => {
                this.terminated = true;
                warn!("operation task ended without delivering an outcome");
                Poll::Ready(T::aborted())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T: Outcome> FusedFuture for OperationFuture<T> {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Future of an execute operation.
pub type ResultFuture = OperationFuture<ExecResult>;

/// Future of a query operation.
pub type RowSetFuture = OperationFuture<RowSet>;

/// Future of a single-row query operation.
pub type SingleRowFuture = OperationFuture<SingleRow>;

/// Spawns driver calls for one dispatch site.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    runtime: Handle,
    participation: Participation,
}

impl Dispatcher {
    pub(crate) fn new(runtime: Handle, participation: Participation) -> Self {
        Self {
            runtime,
            participation,
        }
    }

    /// A dispatcher on the same runtime with different barriers.
    pub(crate) fn with_participation(&self, participation: Participation) -> Self {
        Self {
            runtime: self.runtime.clone(),
            participation,
        }
    }

    /// Run `work` as an independent operation under a child of `parent`.
    pub(crate) fn dispatch<T, F>(
        &self,
        parent: &Context,
        operation: &'static str,
        work: F,
    ) -> (OperationFuture<T>, CancelHandle)
    where
        T: Outcome,
        F: FnOnce(&Context) -> T + Send + 'static,
    {
        let ctx = parent.child();
        let cancel = ctx.cancel_handle();
        let guard = self.participation.enter();
        let (tx, rx) = oneshot::channel();

        debug!(operation, "dispatching operation");
        self.runtime.spawn_blocking(move || {
            let outcome = work(&ctx);
            if tx.send(outcome).is_err() {
                trace!(operation, "outcome dropped, receiver is gone");
            }
            drop(guard);
        });

        (OperationFuture::new(rx), cancel)
    }

    /// Run a setup call on the blocking pool and wait for it.
    pub(crate) async fn run_blocking<T, F>(&self, work: F) -> DriverResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> DriverResult<T> + Send + 'static,
    {
        run_blocking_on(&self.runtime, work).await
    }

    /// Run `work` on the blocking pool once `barrier` drains, without waiting
    /// for either. Failures are logged.
    pub(crate) fn spawn_after_drain<F>(
        &self,
        barrier: Arc<CompletionBarrier>,
        operation: &'static str,
        work: F,
    ) where
        F: FnOnce() -> DriverResult<()> + Send + 'static,
    {
        let runtime = self.runtime.clone();
        self.runtime.spawn(async move {
            barrier.wait().await;
            match run_blocking_on(&runtime, work).await {
                Ok(()) => debug!(operation, "background operation finished"),
                Err(e) => debug!(operation, error = %e, "background operation failed"),
            }
        });
    }
}

pub(crate) async fn run_blocking_on<T, F>(runtime: &Handle, work: F) -> DriverResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> DriverResult<T> + Send + 'static,
{
    runtime
        .spawn_blocking(work)
        .await
        .map_err(|e| DriverError::internal(format!("Task join error: {}", e)))?
}
