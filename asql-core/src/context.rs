//! Cancellable operation contexts.
//!
//! A [`Context`] carries a cancellation signal and an optional deadline down
//! to the driver. Contexts form a tree: cancelling a parent cancels every
//! child derived from it, while cancelling a child leaves the parent alone.
//! Each dispatched operation runs under its own child context, and the
//! [`CancelHandle`] returned with its future cancels exactly that child.
//!
//! ```rust
//! use std::time::Duration;
//! use asql_core::{Context, DriverError};
//!
//! let parent = Context::background();
//! let child = parent.child();
//! let timed = parent.with_timeout(Duration::from_secs(30));
//!
//! child.cancel();
//! assert!(matches!(child.err(), Some(DriverError::Cancelled)));
//! assert!(parent.err().is_none());
//!
//! parent.cancel();
//! assert!(timed.is_done());
//! ```

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::DriverError;

/// A cancellable context with an optional deadline.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A fresh root context that is never cancelled unless asked to.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a child context that inherits this context's deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child context together with the handle that cancels it.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let child = self.child();
        let handle = child.cancel_handle();
        (child, handle)
    }

    /// Derive a child context that expires after `timeout`.
    ///
    /// A timeout too large to express as an instant adds no deadline; the
    /// child keeps the parent's, if any.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Derive a child context that expires at `deadline`.
    ///
    /// The earlier of the parent's deadline and `deadline` wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and all of its descendants.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A handle that cancels this context.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.clone(),
        }
    }

    /// The deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Check if the context was cancelled or its deadline passed.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<DriverError> {
        if self.token.is_cancelled() {
            return Some(DriverError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DriverError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fail with the context's error if it is done.
    ///
    /// Drivers call this before starting work and between rows.
    pub fn check(&self) -> Result<(), DriverError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Wait until the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                let deadline = tokio::time::Instant::from_std(deadline);
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

/// Cancels the context of one dispatched operation.
///
/// Cancelling is idempotent, and cancelling an operation that already
/// delivered its result has no effect. Cancellation never retracts work the
/// driver already applied.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
