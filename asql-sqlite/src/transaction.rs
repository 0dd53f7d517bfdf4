//! SQLite transactions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use asql_core::{
    Context, DriverError, DriverResult, DriverStatement, DriverTransaction, ExecOutcome, RowCursor,
    Value,
};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::connection::Shared;
use crate::engine;
use crate::error::{SqliteError, SqliteResult};
use crate::statement::SqliteStatement;

/// A transaction opened with `BEGIN` on a native connection of its own.
///
/// Committing or rolling back closes that native connection. Dropped
/// without either, it rolls back.
pub struct SqliteTransaction {
    shared: Arc<Shared>,
    done: Arc<AtomicBool>,
}

impl SqliteTransaction {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    fn with_open<T>(&self, f: impl FnOnce(&Connection) -> SqliteResult<T>) -> SqliteResult<T> {
        if self.done.load(Ordering::Acquire) {
            return Err(DriverError::TxDone.into());
        }
        self.shared.with_conn(f)
    }

    fn finish(&self, sql: &'static str) -> SqliteResult<()> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(DriverError::TxDone.into());
        }
        let conn = self
            .shared
            .take()
            .ok_or(SqliteError::Driver(DriverError::ConnectionClosed))?;

        let outcome = conn.execute_batch(sql);
        if outcome.is_err() && !conn.is_autocommit() {
            // A failed COMMIT leaves the transaction open.
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback after failed {} did not succeed", sql);
            }
        }
        if let Err((_, e)) = conn.close() {
            warn!(error = %e, "closing the transaction connection failed");
        }
        outcome?;
        debug!(sql, "sqlite transaction finished");
        Ok(())
    }
}

impl DriverTransaction for SqliteTransaction {
    fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> DriverResult<Box<dyn ExecOutcome>> {
        let summary = self.with_open(|conn| engine::exec(conn, ctx, query, args))?;
        Ok(Box::new(summary))
    }

    fn query(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> DriverResult<Box<dyn RowCursor>> {
        let cursor = self.with_open(|conn| engine::query(conn, ctx, query, args))?;
        Ok(Box::new(cursor))
    }

    fn prepare(&self, ctx: &Context, query: &str) -> DriverResult<Arc<dyn DriverStatement>> {
        self.with_open(|conn| engine::prepare(conn, ctx, query))?;
        Ok(Arc::new(SqliteStatement::new(
            Arc::clone(&self.shared),
            query,
            Some(Arc::clone(&self.done)),
        )))
    }

    fn commit(&self) -> DriverResult<()> {
        Ok(self.finish("COMMIT")?)
    }

    fn rollback(&self) -> DriverResult<()> {
        Ok(self.finish("ROLLBACK")?)
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        debug!("rolling back unfinished sqlite transaction");
        if let Err(e) = self.finish("ROLLBACK") {
            debug!(error = %e, "rollback on drop failed");
        }
    }
}
