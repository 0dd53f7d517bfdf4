//! # asql-core
//!
//! Asynchronous dispatch over synchronous SQL drivers.
//!
//! This crate provides the coordination layer between async callers and a
//! blocking database driver:
//! - Every execute or query call runs as an independent task and delivers
//!   its outcome through a single-use future
//! - Every dispatched operation gets its own cancellable [`Context`]
//! - Transactions wait for all of their in-flight operations before they
//!   commit or roll back
//! - Prepared statements can be closed once their operations have settled
//!
//! The SQL engine itself is a collaborator behind the [`Driver`] traits.
//!
//! ## Dispatching Operations
//!
//! ```rust,ignore
//! use asql_core::{args, Connection};
//!
//! let conn = Connection::open("sqlite", "file::memory:").await?;
//!
//! // Returns immediately; the statement runs on the blocking pool.
//! let (insert, _cancel) = conn.execute(
//!     "INSERT INTO users (id, name) VALUES (?, ?)",
//!     &args![1, "alice"],
//! );
//!
//! let result = insert.await;
//! assert_eq!(result.rows_affected()?, 1);
//! ```
//!
//! ## Cancellation and Deadlines
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use asql_core::Context;
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(2));
//! let (rows, cancel) = conn.query_with_context(&ctx, "SELECT * FROM big_table", &[]);
//!
//! // Cancels this operation only; `ctx` stays live.
//! cancel.cancel();
//! let rows = rows.await;
//! assert!(rows.err().is_some_and(|e| e.is_cancelled()));
//! ```
//!
//! ## Transactions
//!
//! ```rust,ignore
//! let tx = conn.begin().await?;
//! let (first, _) = tx.execute("UPDATE accounts SET balance = balance - 10 WHERE id = 1", &[]);
//! let (second, _) = tx.execute("UPDATE accounts SET balance = balance + 10 WHERE id = 2", &[]);
//!
//! // Waits until both updates delivered their outcome.
//! tx.commit().await?;
//! ```

pub mod barrier;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod logging;
pub mod options;
pub mod registry;
pub mod result;
pub mod row;
pub mod statement;
pub mod transaction;
pub mod value;

pub use barrier::CompletionBarrier;
pub use connection::Connection;
pub use context::{CancelHandle, Context};
pub use dispatch::{OperationFuture, Outcome, ResultFuture, RowSetFuture, SingleRowFuture};
pub use driver::{
    BufferedCursor, Driver, DriverConnection, DriverStatement, DriverTransaction, ExecOutcome,
    ExecSummary, RowCursor,
};
pub use error::{DriverError, DriverResult, Error, Result};
pub use options::{IsolationLevel, TransactionOptions};
pub use registry::{drivers, lookup, register};
pub use result::{ExecResult, RowSet, SingleRow};
pub use row::{FromRow, Row};
pub use statement::Statement;
pub use transaction::Transaction;
pub use value::{FromValue, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::args;
    pub use crate::connection::Connection;
    pub use crate::context::{CancelHandle, Context};
    pub use crate::error::{DriverError, Error, Result};
    pub use crate::options::{IsolationLevel, TransactionOptions};
    pub use crate::result::{ExecResult, RowSet, SingleRow};
    pub use crate::row::{FromRow, Row};
    pub use crate::statement::Statement;
    pub use crate::transaction::Transaction;
    pub use crate::value::{FromValue, Value};
}
