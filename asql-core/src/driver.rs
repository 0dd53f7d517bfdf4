//! The synchronous driver collaborator.
//!
//! Drivers expose blocking calls only. This crate never calls them on an
//! async worker thread: every call runs on the blocking pool of the runtime
//! that opened the connection. Implementations must be `Send + Sync`, since
//! many dispatched operations may use one handle at the same time; how
//! concurrent calls on one native connection are serialized is up to the
//! driver.
//!
//! The traits are deliberately narrow. Execution outcomes are reached
//! through [`ExecOutcome`] and rows through [`RowCursor`], so result wrappers
//! compose by delegation instead of exposing driver types.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{DriverError, DriverResult};
use crate::options::TransactionOptions;
use crate::row::Row;
use crate::value::Value;

/// A driver implementation, registered under a name.
pub trait Driver: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Open a connection from a driver-specific connection string.
    ///
    /// Opening must not require the database to be reachable beyond what
    /// the driver needs to build its handle; no implicit ping.
    fn open(&self, dsn: &str) -> DriverResult<Arc<dyn DriverConnection>>;
}

/// An open driver connection.
pub trait DriverConnection: Send + Sync {
    /// Execute a statement that returns no rows.
    fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> DriverResult<Box<dyn ExecOutcome>>;

    /// Execute a statement that returns rows.
    fn query(&self, ctx: &Context, query: &str, args: &[Value]) -> DriverResult<Box<dyn RowCursor>>;

    /// Execute a statement expected to return at most one row.
    fn query_row(&self, ctx: &Context, query: &str, args: &[Value]) -> DriverResult<Row> {
        first_row(self.query(ctx, query, args)?)
    }

    /// Prepare a statement bound to this connection.
    fn prepare(&self, ctx: &Context, query: &str) -> DriverResult<Arc<dyn DriverStatement>>;

    /// Start a transaction.
    fn begin(
        &self,
        ctx: &Context,
        options: &TransactionOptions,
    ) -> DriverResult<Arc<dyn DriverTransaction>>;

    /// Verify the connection is alive.
    fn ping(&self) -> DriverResult<()>;

    /// Close the connection. Later calls fail with [`DriverError::ConnectionClosed`].
    fn close(&self) -> DriverResult<()>;
}

/// An open driver transaction.
///
/// After `commit` or `rollback`, every call fails with [`DriverError::TxDone`].
pub trait DriverTransaction: Send + Sync {
    /// Execute a statement that returns no rows.
    fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> DriverResult<Box<dyn ExecOutcome>>;

    /// Execute a statement that returns rows.
    fn query(&self, ctx: &Context, query: &str, args: &[Value]) -> DriverResult<Box<dyn RowCursor>>;

    /// Execute a statement expected to return at most one row.
    fn query_row(&self, ctx: &Context, query: &str, args: &[Value]) -> DriverResult<Row> {
        first_row(self.query(ctx, query, args)?)
    }

    /// Prepare a statement bound to this transaction.
    fn prepare(&self, ctx: &Context, query: &str) -> DriverResult<Arc<dyn DriverStatement>>;

    /// Commit the transaction.
    fn commit(&self) -> DriverResult<()>;

    /// Roll the transaction back.
    fn rollback(&self) -> DriverResult<()>;
}

/// A prepared driver statement.
pub trait DriverStatement: Send + Sync {
    /// Execute the statement, expecting no rows.
    fn exec(&self, ctx: &Context, args: &[Value]) -> DriverResult<Box<dyn ExecOutcome>>;

    /// Execute the statement, returning rows.
    fn query(&self, ctx: &Context, args: &[Value]) -> DriverResult<Box<dyn RowCursor>>;

    /// Execute the statement, expecting at most one row.
    fn query_row(&self, ctx: &Context, args: &[Value]) -> DriverResult<Row> {
        first_row(self.query(ctx, args)?)
    }

    /// Release the statement. Later calls fail with [`DriverError::StatementClosed`].
    fn close(&self) -> DriverResult<()>;
}

/// The outcome of a statement that returns no rows.
pub trait ExecOutcome: Send + Sync {
    /// Number of rows changed by the statement.
    fn rows_affected(&self) -> DriverResult<u64>;

    /// Row id generated by the statement, if the driver tracks one.
    fn last_insert_id(&self) -> DriverResult<i64>;
}

/// A forward-only row cursor.
pub trait RowCursor: Send {
    /// Column names of the result.
    fn columns(&self) -> &[String];

    /// Move to the next row. Returns `false` when exhausted or on error.
    fn advance(&mut self) -> bool;

    /// The row the cursor is positioned on.
    fn current(&self) -> Option<&Row>;

    /// The error that stopped iteration, if any.
    fn err(&self) -> Option<&DriverError>;

    /// Release the cursor early.
    fn close(&mut self) -> DriverResult<()>;
}

/// Take the first row of a cursor, or [`DriverError::NoRows`].
pub fn first_row(mut cursor: Box<dyn RowCursor>) -> DriverResult<Row> {
    if cursor.advance() {
        return cursor
            .current()
            .cloned()
            .ok_or_else(|| DriverError::internal("cursor advanced without a current row"));
    }
    match cursor.err() {
        Some(err) => Err(err.clone()),
        None => Err(DriverError::NoRows),
    }
}

/// A plain [`ExecOutcome`] for drivers that know both numbers up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecSummary {
    /// Rows changed.
    pub rows_affected: u64,
    /// Generated row id, when the statement produced one.
    pub last_insert_id: Option<i64>,
}

impl ExecSummary {
    /// Create a summary.
    pub fn new(rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            rows_affected,
            last_insert_id,
        }
    }
}

impl ExecOutcome for ExecSummary {
    fn rows_affected(&self) -> DriverResult<u64> {
        Ok(self.rows_affected)
    }

    fn last_insert_id(&self) -> DriverResult<i64> {
        self.last_insert_id
            .ok_or_else(|| DriverError::internal("last insert id is not available"))
    }
}

/// A [`RowCursor`] over rows the driver already materialized.
///
/// A driver that stopped reading because of an error (for instance a
/// cancelled context) hands over the rows read so far together with that
/// error; the error surfaces once the buffered rows are exhausted.
pub struct BufferedCursor {
    columns: Arc<[String]>,
    pending: VecDeque<Row>,
    current: Option<Row>,
    err: Option<DriverError>,
}

impl BufferedCursor {
    /// Create a cursor over fully read rows.
    pub fn new(columns: Arc<[String]>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            pending: rows.into(),
            current: None,
            err: None,
        }
    }

    /// Create a cursor over a partial read that ended with `err`.
    pub fn with_error(columns: Arc<[String]>, rows: Vec<Row>, err: DriverError) -> Self {
        Self {
            err: Some(err),
            ..Self::new(columns, rows)
        }
    }

    /// Rows not yet visited.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl RowCursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> bool {
        self.current = self.pending.pop_front();
        self.current.is_some()
    }

    fn current(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    fn err(&self) -> Option<&DriverError> {
        if self.pending.is_empty() && self.current.is_none() {
            self.err.as_ref()
        } else {
            None
        }
    }

    fn close(&mut self) -> DriverResult<()> {
        self.pending.clear();
        self.current = None;
        Ok(())
    }
}

impl fmt::Debug for BufferedCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedCursor")
            .field("columns", &self.columns)
            .field("remaining", &self.pending.len())
            .field("err", &self.err)
            .finish()
    }
}
