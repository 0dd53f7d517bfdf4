//! SQLite driver for asql.
//!
//! This crate implements the `asql-core` driver traits over `rusqlite`.
//!
//! # Features
//!
//! - In-memory and file-based databases
//! - Connection pragmas from the connection string
//! - Transactions with `BEGIN DEFERRED` / `BEGIN IMMEDIATE` and read-only mode
//! - Multi-statement scripts
//!
//! All access to one native connection is serialized. A transaction runs on
//! its connection's native handle, so a connection holds at most one open
//! transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use asql_core::Connection;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     asql_sqlite::register();
//!     let conn = Connection::open("sqlite", "sqlite://./app.db?busy_timeout=2000").await?;
//!     conn.ping().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod row;
pub mod statement;
pub mod transaction;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use connection::{SqliteConnection, SqliteDriver};
pub use error::{SqliteError, SqliteResult};
pub use statement::SqliteStatement;
pub use transaction::SqliteTransaction;

/// Names the driver is registered under.
pub const DRIVER_NAMES: [&str; 2] = ["sqlite", "sqlite3"];

/// Register the SQLite driver as `sqlite` and `sqlite3`.
///
/// Calling it again replaces the registration with an identical one.
pub fn register() {
    let driver = Arc::new(SqliteDriver::new());
    for name in DRIVER_NAMES {
        asql_core::register(name, driver.clone());
    }
}
