//! Transaction options.
//!
//! ```rust
//! use asql_core::{IsolationLevel, TransactionOptions};
//!
//! let options = TransactionOptions::new();
//! assert_eq!(options.isolation, None);
//! assert!(!options.read_only);
//!
//! let options = TransactionOptions::new()
//!     .isolation(IsolationLevel::Serializable)
//!     .read_only();
//! assert_eq!(options.isolation, Some(IsolationLevel::Serializable));
//! assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
//! ```

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Read uncommitted - allows dirty reads.
    ReadUncommitted,
    /// Read committed - prevents dirty reads.
    ReadCommitted,
    /// Repeatable read - prevents non-repeatable reads.
    RepeatableRead,
    /// Serializable - highest isolation level.
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL clause for this isolation level.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Options for starting a transaction.
///
/// A `None` isolation level leaves the choice to the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Isolation level.
    pub isolation: Option<IsolationLevel>,
    /// Whether the transaction may only read.
    pub read_only: bool,
}

impl TransactionOptions {
    /// Create options with driver defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the isolation level.
    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Make the transaction read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level() {
        assert_eq!(IsolationLevel::ReadCommitted.as_sql(), "READ COMMITTED");
        assert_eq!(IsolationLevel::RepeatableRead.to_string(), "REPEATABLE READ");
    }

    #[test]
    fn test_options_builder() {
        let options = TransactionOptions::new()
            .isolation(IsolationLevel::ReadUncommitted)
            .read_only();
        assert_eq!(options.isolation, Some(IsolationLevel::ReadUncommitted));
        assert!(options.read_only);
    }
}
