//! Error types for asynchronous database operations.
//!
//! Errors come in two layers:
//!
//! - [`DriverError`] is what a driver collaborator reports from a single
//!   synchronous call (a failed statement, a cancelled context, a finished
//!   transaction, ...).
//! - [`Error`] is what callers of this crate see. Each variant names the
//!   operation that failed and wraps the driver error that caused it.
//!
//! Setup operations (open, begin, prepare, commit, ...) return [`Error`]
//! directly. Dispatched operations never do: their error is captured inside
//! the delivered [`ExecResult`](crate::ExecResult),
//! [`RowSet`](crate::RowSet) or [`SingleRow`](crate::SingleRow).
//!
//! ```rust
//! use asql_core::{DriverError, Error};
//!
//! let err = Error::Query(DriverError::NoRows);
//! assert!(err.is_no_rows());
//! assert!(err.to_string().contains("no rows"));
//!
//! let err = Error::Exec(DriverError::Cancelled);
//! assert!(err.is_cancelled());
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Result type for operations surfaced to callers.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// An error reported by a driver collaborator.
///
/// Cloneable so that a captured error can be handed out more than once by
/// the result wrappers.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The operation's context was cancelled.
    #[error("context canceled")]
    Cancelled,

    /// The operation's context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// A single-row query matched nothing.
    #[error("no rows in result set")]
    NoRows,

    /// The transaction was already committed or rolled back.
    #[error("transaction has already been committed or rolled back")]
    TxDone,

    /// The prepared statement was closed.
    #[error("statement is closed")]
    StatementClosed,

    /// The connection was closed.
    #[error("connection is closed")]
    ConnectionClosed,

    /// A value could not be converted to the requested type.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// An internal failure of the dispatch machinery.
    #[error("internal error: {0}")]
    Internal(String),

    /// A backend-specific failure.
    #[error("{0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl DriverError {
    /// Wrap a backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Arc::new(err))
    }

    /// Create a conversion error.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error comes from context cancellation or a deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// An error surfaced to callers, tagged with the operation that failed.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No driver is registered under the requested name.
    #[error("unknown driver {0:?} (forgotten register?)")]
    UnknownDriver(String),

    /// Opening the connection failed.
    #[error("error opening the database connection: {0}")]
    Open(#[source] DriverError),

    /// Closing the connection or a statement failed.
    #[error("error closing: {0}")]
    Close(#[source] DriverError),

    /// Pinging the database failed.
    #[error("error pinging the database: {0}")]
    Ping(#[source] DriverError),

    /// Starting a transaction failed.
    #[error("error starting a new transaction: {0}")]
    Begin(#[source] DriverError),

    /// Preparing a statement failed.
    #[error("error preparing the query: {0}")]
    Prepare(#[source] DriverError),

    /// Committing a transaction failed.
    #[error("error committing the transaction: {0}")]
    Commit(#[source] DriverError),

    /// Rolling back a transaction failed.
    #[error("error rolling back the transaction: {0}")]
    Rollback(#[source] DriverError),

    /// Reading a script file failed.
    #[error("error reading the file {}: {source}", .path.display())]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A statement that returns no rows failed.
    #[error("error executing the query: {0}")]
    Exec(#[source] DriverError),

    /// A statement that returns rows failed.
    #[error("error querying the database: {0}")]
    Query(#[source] DriverError),

    /// Converting a row into the requested type failed.
    #[error("error scanning the row: {0}")]
    Scan(#[source] DriverError),

    /// The task running an operation ended without delivering its outcome.
    #[error("operation ended before delivering a result")]
    Aborted,
}

impl Error {
    /// Create a read error for a script file.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// The driver error behind this error, if any.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Open(e)
            | Self::Close(e)
            | Self::Ping(e)
            | Self::Begin(e)
            | Self::Prepare(e)
            | Self::Commit(e)
            | Self::Rollback(e)
            | Self::Exec(e)
            | Self::Query(e)
            | Self::Scan(e) => Some(e),
            Self::UnknownDriver(_) | Self::Read { .. } | Self::Aborted => None,
        }
    }

    /// Check if the operation failed because its context was cancelled or timed out.
    pub fn is_cancelled(&self) -> bool {
        self.driver_error().is_some_and(DriverError::is_cancellation)
    }

    /// Check if a single-row query matched nothing.
    pub fn is_no_rows(&self) -> bool {
        matches!(self.driver_error(), Some(DriverError::NoRows))
    }

    /// Check if the operation targeted a finished transaction.
    pub fn is_tx_done(&self) -> bool {
        matches!(self.driver_error(), Some(DriverError::TxDone))
    }
}
