//! Transaction handle.
//!
//! A transaction owns one [`CompletionBarrier`]. Every operation dispatched
//! on the transaction, and every operation dispatched through a statement
//! prepared on it, is registered with that barrier. [`Transaction::commit`]
//! and [`Transaction::rollback`] wait for the barrier to drain before they
//! reach the driver, so finalization never races ahead of submitted work.
//!
//! Both consume the transaction: once finalized there is no handle left to
//! dispatch on. Statements prepared on it can outlive it, and their
//! operations then fail with [`DriverError::TxDone`](crate::DriverError::TxDone).

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::barrier::{CompletionBarrier, Participation};
use crate::context::{CancelHandle, Context};
use crate::dispatch::{Dispatcher, ResultFuture, RowSetFuture, SingleRowFuture};
use crate::driver::DriverTransaction;
use crate::error::{DriverError, DriverResult, Error, Result};
use crate::options::TransactionOptions;
use crate::result::{ExecResult, RowSet, SingleRow};
use crate::statement::Statement;
use crate::value::Value;

/// An open transaction.
///
/// Dropped without commit or rollback, it rolls back on the blocking pool
/// once its in-flight operations delivered.
pub struct Transaction {
    inner: Arc<dyn DriverTransaction>,
    barrier: Arc<CompletionBarrier>,
    dispatcher: Dispatcher,
    options: TransactionOptions,
    finished: bool,
}

impl Transaction {
    pub(crate) fn new(
        inner: Arc<dyn DriverTransaction>,
        options: TransactionOptions,
        parent: &Dispatcher,
    ) -> Self {
        let barrier = Arc::new(CompletionBarrier::new());
        let dispatcher = parent.with_participation(Participation::shared(Arc::clone(&barrier)));
        Self {
            inner,
            barrier,
            dispatcher,
            options,
            finished: false,
        }
    }

    /// Options the transaction was started with.
    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    /// Number of dispatched operations that have not delivered yet.
    pub fn in_flight(&self) -> usize {
        self.barrier.in_flight()
    }

    /// Dispatch a statement that returns no rows.
    pub fn execute(&self, query: &str, args: &[Value]) -> (ResultFuture, CancelHandle) {
        self.execute_with_context(&Context::background(), query, args)
    }

    /// Dispatch a statement that returns no rows, under `ctx`.
    pub fn execute_with_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> (ResultFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "tx_exec", move |ctx| {
            ExecResult::new(inner.exec(ctx, &query, &args))
        })
    }

    /// Dispatch a query.
    pub fn query(&self, query: &str, args: &[Value]) -> (RowSetFuture, CancelHandle) {
        self.query_with_context(&Context::background(), query, args)
    }

    /// Dispatch a query under `ctx`.
    pub fn query_with_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> (RowSetFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "tx_query", move |ctx| {
            RowSet::new(inner.query(ctx, &query, &args))
        })
    }

    /// Dispatch a query expected to return at most one row.
    pub fn query_row(&self, query: &str, args: &[Value]) -> (SingleRowFuture, CancelHandle) {
        self.query_row_with_context(&Context::background(), query, args)
    }

    /// Dispatch a query expected to return at most one row, under `ctx`.
    pub fn query_row_with_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> (SingleRowFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "tx_query_row", move |ctx| {
            SingleRow::new(inner.query_row(ctx, &query, &args))
        })
    }

    /// Prepare a statement whose operations gate this transaction's end.
    pub async fn prepare(&self, query: &str) -> Result<Statement> {
        self.prepare_with_context(&Context::background(), query).await
    }

    /// Prepare a statement under `ctx`.
    pub async fn prepare_with_context(&self, ctx: &Context, query: &str) -> Result<Statement> {
        let inner = Arc::clone(&self.inner);
        let ctx = ctx.clone();
        let sql = query.to_string();
        let stmt = self
            .dispatcher
            .run_blocking(move || inner.prepare(&ctx, &sql))
            .await
            .map_err(Error::Prepare)?;
        Ok(Statement::new(
            query,
            stmt,
            &self.dispatcher,
            Some(Arc::clone(&self.barrier)),
        ))
    }

    /// Wait for every dispatched operation, then commit.
    #[instrument(skip(self))]
    pub async fn commit(mut self) -> Result<()> {
        self.finish("commit", |tx| tx.commit())
            .await
            .map_err(Error::Commit)
    }

    /// Wait for every dispatched operation, then roll back.
    #[instrument(skip(self))]
    pub async fn rollback(mut self) -> Result<()> {
        self.finish("rollback", |tx| tx.rollback())
            .await
            .map_err(Error::Rollback)
    }

    async fn finish<F>(&mut self, operation: &'static str, end: F) -> DriverResult<()>
    where
        F: FnOnce(&dyn DriverTransaction) -> DriverResult<()> + Send + 'static,
    {
        debug!(operation, in_flight = self.in_flight(), "waiting for in-flight operations");
        self.barrier.wait().await;
        self.finished = true;

        let inner = Arc::clone(&self.inner);
        self.dispatcher.run_blocking(move || end(inner.as_ref())).await?;
        debug!(operation, "transaction finished");
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            in_flight = self.barrier.in_flight(),
            "transaction dropped without commit or rollback, rolling back"
        );
        // Roll back on the blocking pool once in-flight operations drained.
        let inner = Arc::clone(&self.inner);
        let barrier = Arc::clone(&self.barrier);
        self.dispatcher.spawn_after_drain(barrier, "rollback", move || {
            match inner.rollback() {
                Err(DriverError::TxDone) => Ok(()),
                other => other,
            }
        });
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("options", &self.options)
            .field("in_flight", &self.in_flight())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
