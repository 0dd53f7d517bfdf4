//! Prepared statement handle.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::barrier::{CompletionBarrier, Participation};
use crate::context::{CancelHandle, Context};
use crate::dispatch::{Dispatcher, ResultFuture, RowSetFuture, SingleRowFuture};
use crate::driver::DriverStatement;
use crate::error::{Error, Result};
use crate::result::{ExecResult, RowSet, SingleRow};
use crate::value::Value;

/// A prepared statement.
///
/// A statement prepared on a transaction registers every operation with
/// the transaction's barrier, so the transaction cannot finish while one of
/// them is in flight. A statement prepared on a connection gates nothing.
///
/// Each statement also counts its own operations, and [`close`](Self::close)
/// waits for them before releasing the driver statement. Dropping the
/// statement releases the driver statement once its last in-flight
/// operation has finished.
pub struct Statement {
    sql: Arc<str>,
    inner: Arc<dyn DriverStatement>,
    pending: Arc<CompletionBarrier>,
    in_transaction: bool,
    dispatcher: Dispatcher,
}

impl Statement {
    pub(crate) fn new(
        sql: &str,
        inner: Arc<dyn DriverStatement>,
        parent: &Dispatcher,
        transaction: Option<Arc<CompletionBarrier>>,
    ) -> Self {
        let pending = Arc::new(CompletionBarrier::new());
        let mut participation = Participation::shared(Arc::clone(&pending));
        let in_transaction = transaction.is_some();
        if let Some(barrier) = transaction {
            participation = participation.join(barrier);
        }
        Self {
            sql: Arc::from(sql),
            inner,
            pending,
            in_transaction,
            dispatcher: parent.with_participation(participation),
        }
    }

    /// The prepared SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Check if the statement was prepared on a transaction.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Number of this statement's operations that have not delivered yet.
    pub fn in_flight(&self) -> usize {
        self.pending.in_flight()
    }

    /// Dispatch the statement, expecting no rows.
    pub fn execute(&self, args: &[Value]) -> (ResultFuture, CancelHandle) {
        self.execute_with_context(&Context::background(), args)
    }

    /// Dispatch the statement under `ctx`, expecting no rows.
    pub fn execute_with_context(
        &self,
        ctx: &Context,
        args: &[Value],
    ) -> (ResultFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "stmt_exec", move |ctx| {
            ExecResult::new(inner.exec(ctx, &args))
        })
    }

    /// Dispatch the statement, returning rows.
    pub fn query(&self, args: &[Value]) -> (RowSetFuture, CancelHandle) {
        self.query_with_context(&Context::background(), args)
    }

    /// Dispatch the statement under `ctx`, returning rows.
    pub fn query_with_context(
        &self,
        ctx: &Context,
        args: &[Value],
    ) -> (RowSetFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "stmt_query", move |ctx| {
            RowSet::new(inner.query(ctx, &args))
        })
    }

    /// Dispatch the statement, expecting at most one row.
    pub fn query_row(&self, args: &[Value]) -> (SingleRowFuture, CancelHandle) {
        self.query_row_with_context(&Context::background(), args)
    }

    /// Dispatch the statement under `ctx`, expecting at most one row.
    pub fn query_row_with_context(
        &self,
        ctx: &Context,
        args: &[Value],
    ) -> (SingleRowFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "stmt_query_row", move |ctx| {
            SingleRow::new(inner.query_row(ctx, &args))
        })
    }

    /// Wait for this statement's in-flight operations, then release it.
    pub async fn close(self) -> Result<()> {
        debug!(sql = %self.sql, in_flight = self.in_flight(), "closing statement");
        self.pending.wait().await;
        let inner = Arc::clone(&self.inner);
        self.dispatcher
            .run_blocking(move || inner.close())
            .await
            .map_err(Error::Close)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("in_transaction", &self.in_transaction)
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}
