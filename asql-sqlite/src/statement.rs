//! SQLite prepared statements.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use asql_core::{Context, DriverError, DriverResult, DriverStatement, ExecOutcome, RowCursor, Value};
use rusqlite::Connection;

use crate::connection::Shared;
use crate::engine;
use crate::error::SqliteResult;

/// A prepared statement.
///
/// The compiled statement lives in the connection's statement cache; this
/// handle keeps the SQL text and checks that it is still usable: not
/// closed, and, when prepared in a transaction, that transaction not yet
/// finished.
pub struct SqliteStatement {
    shared: Arc<Shared>,
    sql: String,
    tx_done: Option<Arc<AtomicBool>>,
    closed: AtomicBool,
}

impl SqliteStatement {
    pub(crate) fn new(shared: Arc<Shared>, sql: &str, tx_done: Option<Arc<AtomicBool>>) -> Self {
        Self {
            shared,
            sql: sql.to_string(),
            tx_done,
            closed: AtomicBool::new(false),
        }
    }

    fn with_usable<T>(&self, f: impl FnOnce(&Connection) -> SqliteResult<T>) -> SqliteResult<T> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::StatementClosed.into());
        }
        if self.tx_done.as_ref().is_some_and(|done| done.load(Ordering::Acquire)) {
            return Err(DriverError::TxDone.into());
        }
        self.shared.with_conn(f)
    }
}

impl DriverStatement for SqliteStatement {
    fn exec(&self, ctx: &Context, args: &[Value]) -> DriverResult<Box<dyn ExecOutcome>> {
        let summary = self.with_usable(|conn| engine::exec(conn, ctx, &self.sql, args))?;
        Ok(Box::new(summary))
    }

    fn query(&self, ctx: &Context, args: &[Value]) -> DriverResult<Box<dyn RowCursor>> {
        let cursor = self.with_usable(|conn| engine::query(conn, ctx, &self.sql, args))?;
        Ok(Box::new(cursor))
    }

    fn close(&self) -> DriverResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
