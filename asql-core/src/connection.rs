//! Connection handle.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, instrument};

use crate::barrier::Participation;
use crate::context::{CancelHandle, Context};
use crate::dispatch::{Dispatcher, ResultFuture, RowSetFuture, SingleRowFuture, run_blocking_on};
use crate::driver::{Driver, DriverConnection};
use crate::error::{Error, Result};
use crate::options::TransactionOptions;
use crate::registry;
use crate::result::{ExecResult, RowSet, SingleRow};
use crate::statement::Statement;
use crate::transaction::Transaction;
use crate::value::Value;

/// An open database connection.
///
/// Operations dispatched directly on a connection participate in no
/// barrier: nothing waits for them except the caller awaiting their future.
/// Dispatch methods take `&self`, so one connection can be shared (for
/// instance behind an `Arc`) and used from many tasks at once.
///
/// ```rust,ignore
/// let conn = Connection::open("sqlite", "file::memory:").await?;
/// let (future, _cancel) = conn.execute("CREATE TABLE t (id INTEGER)", &[]);
/// future.await.err().map_or(Ok(()), |e| Err(e.clone()))?;
/// ```
pub struct Connection {
    driver: String,
    inner: Arc<dyn DriverConnection>,
    dispatcher: Dispatcher,
}

impl Connection {
    /// Open a connection through the driver registered under `driver_name`.
    ///
    /// Both arguments are forwarded to the driver unchanged. The connection
    /// is not pinged.
    pub async fn open(driver_name: &str, dsn: &str) -> Result<Self> {
        let driver = registry::lookup(driver_name)
            .ok_or_else(|| Error::UnknownDriver(driver_name.to_string()))?;
        Self::open_with(driver, dsn).await
    }

    /// Open a connection with an explicit driver.
    ///
    /// Must be called within a Tokio runtime; the connection dispatches its
    /// operations on that runtime's blocking pool.
    #[instrument(skip_all)]
    pub async fn open_with(driver: Arc<dyn Driver>, dsn: &str) -> Result<Self> {
        let runtime = Handle::current();
        let name = driver.name().to_string();
        let dsn = dsn.to_string();
        let inner = run_blocking_on(&runtime, move || driver.open(&dsn))
            .await
            .map_err(Error::Open)?;
        info!(driver = %name, "connection opened");
        Ok(Self {
            driver: name,
            inner,
            dispatcher: Dispatcher::new(runtime, Participation::detached()),
        })
    }

    /// Name of the driver behind this connection.
    pub fn driver_name(&self) -> &str {
        &self.driver
    }

    /// Close the connection.
    ///
    /// Operations still in flight fail with a closed-connection error.
    pub async fn close(self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.dispatcher
            .run_blocking(move || inner.close())
            .await
            .map_err(Error::Close)?;
        info!(driver = %self.driver, "connection closed");
        Ok(())
    }

    /// Verify the connection is alive.
    pub async fn ping(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.dispatcher
            .run_blocking(move || inner.ping())
            .await
            .map_err(Error::Ping)
    }

    /// Read a file and execute its whole content as one statement batch.
    ///
    /// A file that cannot be read fails with [`Error::Read`] and nothing is
    /// executed. Partial application of a failing batch is up to the driver.
    pub async fn load_script(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let script = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::read(path, e))?;
        debug!(path = %path.display(), bytes = script.len(), "loading script");

        let inner = Arc::clone(&self.inner);
        self.dispatcher
            .run_blocking(move || inner.exec(&Context::background(), &script, &[]).map(|_| ()))
            .await
            .map_err(Error::Exec)
    }

    /// Start a transaction with driver defaults.
    pub async fn begin(&self) -> Result<Transaction> {
        self.begin_with_options(&Context::background(), TransactionOptions::default())
            .await
    }

    /// Start a transaction.
    #[instrument(skip(self, ctx), fields(driver = %self.driver))]
    pub async fn begin_with_options(
        &self,
        ctx: &Context,
        options: TransactionOptions,
    ) -> Result<Transaction> {
        let inner = Arc::clone(&self.inner);
        let ctx = ctx.clone();
        let tx = self
            .dispatcher
            .run_blocking(move || inner.begin(&ctx, &options))
            .await
            .map_err(Error::Begin)?;
        debug!("transaction started");
        Ok(Transaction::new(tx, options, &self.dispatcher))
    }

    /// Dispatch a statement that returns no rows.
    pub fn execute(&self, query: &str, args: &[Value]) -> (ResultFuture, CancelHandle) {
        self.execute_with_context(&Context::background(), query, args)
    }

    /// Dispatch a statement that returns no rows, under `ctx`.
    pub fn execute_with_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> (ResultFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "exec", move |ctx| {
            ExecResult::new(inner.exec(ctx, &query, &args))
        })
    }

    /// Dispatch a query.
    pub fn query(&self, query: &str, args: &[Value]) -> (RowSetFuture, CancelHandle) {
        self.query_with_context(&Context::background(), query, args)
    }

    /// Dispatch a query under `ctx`.
    pub fn query_with_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> (RowSetFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "query", move |ctx| {
            RowSet::new(inner.query(ctx, &query, &args))
        })
    }

    /// Dispatch a query expected to return at most one row.
    pub fn query_row(&self, query: &str, args: &[Value]) -> (SingleRowFuture, CancelHandle) {
        self.query_row_with_context(&Context::background(), query, args)
    }

    /// Dispatch a query expected to return at most one row, under `ctx`.
    pub fn query_row_with_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> (SingleRowFuture, CancelHandle) {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let args = args.to_vec();
        self.dispatcher.dispatch(ctx, "query_row", move |ctx| {
            SingleRow::new(inner.query_row(ctx, &query, &args))
        })
    }

    /// Prepare a statement. Its operations participate in no barrier.
    pub async fn prepare(&self, query: &str) -> Result<Statement> {
        self.prepare_with_context(&Context::background(), query).await
    }

    /// Prepare a statement under `ctx`.
    pub async fn prepare_with_context(&self, ctx: &Context, query: &str) -> Result<Statement> {
        let inner = Arc::clone(&self.inner);
        let ctx = ctx.clone();
        let sql = query.to_string();
        let stmt = self
            .dispatcher
            .run_blocking(move || inner.prepare(&ctx, &sql))
            .await
            .map_err(Error::Prepare)?;
        Ok(Statement::new(query, stmt, &self.dispatcher, None))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}
