//! # asql
//!
//! Asynchronous dispatch over synchronous SQL drivers.
//!
//! asql provides:
//! - Non-blocking execute and query calls that return a single-use future
//!   together with a per-operation cancel handle
//! - Deadlines and cancellation through [`Context`]
//! - Transactions whose commit and rollback wait for every operation
//!   dispatched under them
//! - A bundled SQLite driver (the `sqlite` feature, on by default)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use asql::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), asql::Error> {
//!     let conn = asql::open("sqlite", "file::memory:").await?;
//!     conn.load_script("schema.sql").await?;
//!
//!     let tx = conn.begin().await?;
//!     let (first, _) = tx.execute("INSERT INTO users (name) VALUES (?)", &args!["alice"]);
//!     let (second, _) = tx.execute("INSERT INTO users (name) VALUES (?)", &args!["bob"]);
//!     tx.commit().await?;
//!
//!     assert_eq!(first.await.rows_affected()?, 1);
//!     assert_eq!(second.await.rows_affected()?, 1);
//!
//!     let (count, _) = conn.query_row("SELECT count(*) FROM users", &[]);
//!     let count: i64 = count.await.scan()?;
//!     println!("{count} users");
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Once;

pub use asql_core::*;

/// The bundled SQLite driver.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use asql_sqlite::*;
}

/// Register every driver bundled through enabled features.
///
/// Runs once per process; later calls do nothing.
pub fn register_builtin_drivers() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        #[cfg(feature = "sqlite")]
        asql_sqlite::register();
    });
}

/// Open a connection, registering the bundled drivers first.
///
/// Same as [`Connection::open`] otherwise.
pub async fn open(driver_name: &str, dsn: &str) -> Result<Connection> {
    register_builtin_drivers();
    Connection::open(driver_name, dsn).await
}
