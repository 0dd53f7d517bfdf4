//! Error types for SQLite operations.

use std::fmt;

use asql_core::DriverError;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Debug)]
pub enum SqliteError {
    /// SQLite driver error.
    Sqlite(rusqlite::Error),
    /// Configuration error.
    Config(String),
    /// Type conversion error.
    TypeConversion(String),
    /// A condition the core layer already has a name for (cancellation,
    /// finished transaction, closed handle, ...).
    Driver(DriverError),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }
}

impl fmt::Display for SqliteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::TypeConversion(msg) => write!(f, "Type conversion error: {}", msg),
            Self::Driver(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SqliteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::Driver(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(err)
    }
}

impl From<DriverError> for SqliteError {
    fn from(err: DriverError) -> Self {
        Self::Driver(err)
    }
}

impl From<SqliteError> for DriverError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Driver(e) => e,
            SqliteError::Sqlite(rusqlite::Error::QueryReturnedNoRows) => DriverError::NoRows,
            SqliteError::Sqlite(e @ rusqlite::Error::InvalidColumnType(..))
            | SqliteError::Sqlite(e @ rusqlite::Error::FromSqlConversionFailure(..)) => {
                DriverError::conversion(e.to_string())
            }
            SqliteError::TypeConversion(msg) => DriverError::conversion(msg),
            other => DriverError::backend(other),
        }
    }
}
