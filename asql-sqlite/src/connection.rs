//! SQLite driver and connection.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use asql_core::{
    Context, Driver, DriverConnection, DriverError, DriverResult, DriverStatement,
    DriverTransaction, ExecOutcome, IsolationLevel, RowCursor, TransactionOptions, Value,
};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::config::{DatabasePath, SqliteConfig};
use crate::engine;
use crate::error::{SqliteError, SqliteResult};
use crate::statement::SqliteStatement;
use crate::transaction::SqliteTransaction;

/// The SQLite driver.
///
/// Connection strings are parsed by [`SqliteConfig::from_url`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create the driver.
    pub fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn open(&self, dsn: &str) -> DriverResult<Arc<dyn DriverConnection>> {
        let config = SqliteConfig::from_url(dsn)?;
        Ok(Arc::new(SqliteConnection::open(config)?))
    }
}

/// A native connection, shared by a connection or transaction and the
/// statements prepared on it.
///
/// SQLite connections are not thread-safe, so all access goes through one
/// mutex. `None` once the connection was closed.
pub(crate) struct Shared {
    conn: Mutex<Option<Connection>>,
}

impl Shared {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Run `f` with the native connection locked.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> SqliteResult<T>,
    ) -> SqliteResult<T> {
        let guard = self.conn.lock();
        let conn = guard
            .as_ref()
            .ok_or(SqliteError::Driver(DriverError::ConnectionClosed))?;
        f(conn)
    }

    /// Take the native connection out, leaving the handle closed.
    pub(crate) fn take(&self) -> Option<Connection> {
        self.conn.lock().take()
    }
}

static NEXT_MEMORY_DATABASE: AtomicU64 = AtomicU64::new(0);

/// Where native connections for one database are opened.
#[derive(Debug, Clone)]
enum Target {
    /// A named shared-cache memory database. It lives while any native
    /// connection to it is open.
    Memory(String),
    File(PathBuf),
}

impl Target {
    fn new(path: &DatabasePath) -> Self {
        match path {
            DatabasePath::Memory => {
                let id = NEXT_MEMORY_DATABASE.fetch_add(1, Ordering::Relaxed);
                Self::Memory(format!(
                    "file:asql-{}-{id}?mode=memory&cache=shared",
                    std::process::id()
                ))
            }
            DatabasePath::File(path) => Self::File(path.clone()),
        }
    }

    /// Open a native connection and apply the configured pragmas.
    fn open(&self, config: &SqliteConfig) -> SqliteResult<Connection> {
        let conn = match self {
            Self::Memory(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
            Self::File(path) => Connection::open(path)?,
        };
        conn.execute_batch(&config.init_sql())?;
        Ok(conn)
    }
}

/// An open SQLite connection.
///
/// Each transaction runs on a native connection of its own, opened on the
/// same database in `begin`. Statements issued on the connection while a
/// transaction is open therefore commit independently of it. An in-memory
/// database is opened as a named shared-cache database so its transactions
/// see the same data.
pub struct SqliteConnection {
    shared: Arc<Shared>,
    target: Target,
    config: SqliteConfig,
}

impl SqliteConnection {
    /// Open a connection and apply the configured pragmas.
    pub fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let target = Target::new(&config.path);
        let conn = target.open(&config)?;

        info!(path = ?config.path, "sqlite connection opened");
        Ok(Self {
            shared: Arc::new(Shared::new(conn)),
            target,
            config,
        })
    }

    /// The configuration the connection was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    fn open_transaction(
        &self,
        ctx: &Context,
        options: &TransactionOptions,
    ) -> SqliteResult<SqliteTransaction> {
        ctx.check()?;
        // Refuse once the connection itself was closed.
        self.shared.with_conn(|_| Ok(()))?;

        let conn = self.target.open(&self.config)?;
        if options.read_only {
            conn.execute_batch("PRAGMA query_only = ON")?;
        }
        let begin = begin_sql(options.isolation);
        conn.execute_batch(begin)?;

        debug!(begin, read_only = options.read_only, "sqlite transaction started");
        Ok(SqliteTransaction::new(Arc::new(Shared::new(conn))))
    }
}

fn begin_sql(isolation: Option<IsolationLevel>) -> &'static str {
    match isolation {
        Some(IsolationLevel::Serializable | IsolationLevel::RepeatableRead) => "BEGIN IMMEDIATE",
        _ => "BEGIN DEFERRED",
    }
}

impl DriverConnection for SqliteConnection {
    fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> DriverResult<Box<dyn ExecOutcome>> {
        let summary = self
            .shared
            .with_conn(|conn| engine::exec(conn, ctx, query, args))?;
        Ok(Box::new(summary))
    }

    fn query(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> DriverResult<Box<dyn RowCursor>> {
        let cursor = self
            .shared
            .with_conn(|conn| engine::query(conn, ctx, query, args))?;
        Ok(Box::new(cursor))
    }

    fn prepare(&self, ctx: &Context, query: &str) -> DriverResult<Arc<dyn DriverStatement>> {
        self.shared
            .with_conn(|conn| engine::prepare(conn, ctx, query))?;
        Ok(Arc::new(SqliteStatement::new(
            Arc::clone(&self.shared),
            query,
            None,
        )))
    }

    fn begin(
        &self,
        ctx: &Context,
        options: &TransactionOptions,
    ) -> DriverResult<Arc<dyn DriverTransaction>> {
        Ok(Arc::new(self.open_transaction(ctx, options)?))
    }

    fn ping(&self) -> DriverResult<()> {
        self.shared.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })?;
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        let Some(conn) = self.shared.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, e)| SqliteError::from(e))?;
        info!("sqlite connection closed");
        Ok(())
    }
}
