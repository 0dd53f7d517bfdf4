//! Coordination tests against an in-memory mock driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use asql_core::prelude::*;
use asql_core::{
    BufferedCursor, Driver, DriverConnection, DriverResult, DriverStatement, DriverTransaction,
    ExecOutcome, ExecSummary, RowCursor,
};
use parking_lot::{Condvar, Mutex};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Shared {
    log: Mutex<Vec<String>>,
    gate: Mutex<bool>,
    gate_cv: Condvar,
}

impl Shared {
    fn record(&self, entry: impl Into<String>) {
        self.log.lock().push(entry.into());
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn open_gate(&self) {
        *self.gate.lock() = true;
        self.gate_cv.notify_all();
    }

    fn wait_gate(&self) {
        let mut open = self.gate.lock();
        while !*open {
            self.gate_cv.wait(&mut open);
        }
    }

    fn run(&self, ctx: &Context, query: &str) -> DriverResult<Box<dyn ExecOutcome>> {
        match query {
            "BLOCK" => self.wait_gate(),
            "PANIC" => panic!("mock driver panic"),
            "FAIL" => return Err(DriverError::internal("mock failure")),
            "UNTIL_CANCELLED" => loop {
                ctx.check()?;
                std::thread::sleep(Duration::from_millis(5));
            },
            _ => {}
        }
        self.record(format!("exec {query}"));
        Ok(Box::new(ExecSummary::new(1, Some(42))))
    }

    fn rows(&self, ctx: &Context) -> DriverResult<Box<dyn RowCursor>> {
        ctx.check()?;
        let columns: Arc<[String]> = Arc::from(vec!["id".to_string()]);
        let rows = (1..=3)
            .map(|i| Row::new(Arc::clone(&columns), vec![Value::Integer(i)]))
            .collect();
        Ok(Box::new(BufferedCursor::new(columns, rows)))
    }
}

struct MockDriver {
    shared: Arc<Shared>,
}

impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    fn open(&self, dsn: &str) -> DriverResult<Arc<dyn DriverConnection>> {
        if dsn == "unreachable" {
            return Err(DriverError::internal("cannot reach mock database"));
        }
        Ok(Arc::new(MockConnection {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MockConnection {
    shared: Arc<Shared>,
}

impl DriverConnection for MockConnection {
    fn exec(
        &self,
        ctx: &Context,
        query: &str,
        _args: &[Value],
    ) -> DriverResult<Box<dyn ExecOutcome>> {
        self.shared.run(ctx, query)
    }

    fn query(
        &self,
        ctx: &Context,
        _query: &str,
        _args: &[Value],
    ) -> DriverResult<Box<dyn RowCursor>> {
        self.shared.rows(ctx)
    }

    fn prepare(&self, _ctx: &Context, query: &str) -> DriverResult<Arc<dyn DriverStatement>> {
        Ok(Arc::new(MockStatement {
            shared: Arc::clone(&self.shared),
            query: query.to_string(),
            tx_done: None,
            closed: AtomicBool::new(false),
        }))
    }

    fn begin(
        &self,
        _ctx: &Context,
        _options: &TransactionOptions,
    ) -> DriverResult<Arc<dyn DriverTransaction>> {
        self.shared.record("begin");
        Ok(Arc::new(MockTransaction {
            shared: Arc::clone(&self.shared),
            done: Arc::new(AtomicBool::new(false)),
        }))
    }

    fn ping(&self) -> DriverResult<()> {
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        self.shared.record("close");
        Ok(())
    }
}

struct MockTransaction {
    shared: Arc<Shared>,
    done: Arc<AtomicBool>,
}

impl MockTransaction {
    fn check_open(&self) -> DriverResult<()> {
        if self.done.load(Ordering::Acquire) {
            return Err(DriverError::TxDone);
        }
        Ok(())
    }

    fn finish(&self, entry: &str) -> DriverResult<()> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(DriverError::TxDone);
        }
        self.shared.record(entry);
        Ok(())
    }
}

impl DriverTransaction for MockTransaction {
    fn exec(
        &self,
        ctx: &Context,
        query: &str,
        _args: &[Value],
    ) -> DriverResult<Box<dyn ExecOutcome>> {
        self.check_open()?;
        self.shared.run(ctx, query)
    }

    fn query(
        &self,
        ctx: &Context,
        _query: &str,
        _args: &[Value],
    ) -> DriverResult<Box<dyn RowCursor>> {
        self.check_open()?;
        self.shared.rows(ctx)
    }

    fn prepare(&self, _ctx: &Context, query: &str) -> DriverResult<Arc<dyn DriverStatement>> {
        self.check_open()?;
        Ok(Arc::new(MockStatement {
            shared: Arc::clone(&self.shared),
            query: query.to_string(),
            tx_done: Some(Arc::clone(&self.done)),
            closed: AtomicBool::new(false),
        }))
    }

    fn commit(&self) -> DriverResult<()> {
        self.finish("commit")
    }

    fn rollback(&self) -> DriverResult<()> {
        self.finish("rollback")
    }
}

struct MockStatement {
    shared: Arc<Shared>,
    query: String,
    tx_done: Option<Arc<AtomicBool>>,
    closed: AtomicBool,
}

impl MockStatement {
    fn check_usable(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::StatementClosed);
        }
        if self.tx_done.as_ref().is_some_and(|d| d.load(Ordering::Acquire)) {
            return Err(DriverError::TxDone);
        }
        Ok(())
    }
}

impl DriverStatement for MockStatement {
    fn exec(&self, ctx: &Context, _args: &[Value]) -> DriverResult<Box<dyn ExecOutcome>> {
        self.check_usable()?;
        self.shared.run(ctx, &self.query)
    }

    fn query(&self, ctx: &Context, _args: &[Value]) -> DriverResult<Box<dyn RowCursor>> {
        self.check_usable()?;
        self.shared.rows(ctx)
    }

    fn close(&self) -> DriverResult<()> {
        self.closed.store(true, Ordering::Release);
        self.shared.record("stmt close");
        Ok(())
    }
}

async fn open_mock() -> (Connection, Arc<Shared>) {
    let shared = Arc::new(Shared::default());
    let driver = Arc::new(MockDriver {
        shared: Arc::clone(&shared),
    });
    let conn = Connection::open_with(driver, "mock").await.unwrap();
    (conn, shared)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_commit_waits_for_in_flight_exec() {
    let (conn, shared) = open_mock().await;
    let tx = conn.begin().await.unwrap();

    let (blocked, _cancel) = tx.execute("BLOCK", &[]);
    assert_eq!(tx.in_flight(), 1);

    let commit = tokio::spawn(tx.commit());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!commit.is_finished());
    assert!(!shared.log().contains(&"commit".to_string()));

    shared.open_gate();
    commit.await.unwrap().unwrap();

    let result = blocked.await;
    assert!(result.err().is_none());
    assert_eq!(shared.log(), vec!["begin", "exec BLOCK", "commit"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rollback_waits_for_prepared_statement() {
    let (conn, shared) = open_mock().await;
    let tx = conn.begin().await.unwrap();
    let stmt = tx.prepare("BLOCK").await.unwrap();
    assert!(stmt.in_transaction());

    let (pending, _cancel) = stmt.execute(&[]);
    assert_eq!(tx.in_flight(), 1);
    assert_eq!(stmt.in_flight(), 1);

    let rollback = tokio::spawn(tx.rollback());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!rollback.is_finished());

    shared.open_gate();
    rollback.await.unwrap().unwrap();
    assert!(pending.await.err().is_none());
    assert_eq!(shared.log(), vec!["begin", "exec BLOCK", "rollback"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dropped_transaction_rolls_back_after_in_flight_exec() {
    let (conn, shared) = open_mock().await;
    let tx = conn.begin().await.unwrap();

    let (pending, _cancel) = tx.execute("BLOCK", &[]);
    drop(tx);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(shared.log(), vec!["begin"]);

    shared.open_gate();
    assert!(pending.await.err().is_none());
    tokio::time::timeout(Duration::from_secs(5), async {
        while !shared.log().contains(&"rollback".to_string()) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("dropped transaction should roll back");
    assert_eq!(shared.log(), vec!["begin", "exec BLOCK", "rollback"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_barrier_drains_after_many_operations() {
    let (conn, shared) = open_mock().await;
    shared.open_gate();
    let tx = conn.begin().await.unwrap();

    let futures: Vec<_> = (0..16)
        .map(|i| tx.execute(if i % 2 == 0 { "BLOCK" } else { "UPDATE" }, &[]).0)
        .collect();
    for result in futures::future::join_all(futures).await {
        assert_eq!(result.rows_affected().unwrap(), 1);
    }
    assert_eq!(tx.in_flight(), 0);
    tx.commit().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_and_abandoned_operation_does_not_block_commit() {
    let (conn, shared) = open_mock().await;
    let tx = conn.begin().await.unwrap();

    let (future, cancel) = tx.execute("UNTIL_CANCELLED", &[]);
    cancel.cancel();
    drop(future);

    tokio::time::timeout(Duration::from_secs(5), tx.commit())
        .await
        .expect("commit should not hang")
        .unwrap();
    assert_eq!(shared.log(), vec!["begin", "commit"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_reports_cancellation_in_result() {
    let (conn, _shared) = open_mock().await;
    let (future, cancel) = conn.execute("UNTIL_CANCELLED", &[]);
    cancel.cancel();
    let result = future.await;
    assert!(result.err().unwrap().is_cancelled());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_after_delivery_is_a_noop() {
    let (conn, _shared) = open_mock().await;
    let (future, cancel) = conn.execute("UPDATE", &[]);
    let result = future.await;
    cancel.cancel();
    cancel.cancel();
    assert_eq!(result.rows_affected().unwrap(), 1);
    assert_eq!(result.last_insert_id().unwrap(), 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deadline_surfaces_in_rowset() {
    let (conn, _shared) = open_mock().await;
    let ctx = Context::background().with_timeout(Duration::ZERO);
    let (future, _cancel) = conn.query_with_context(&ctx, "SELECT id FROM t", &[]);
    let mut rows = future.await;
    assert!(!rows.next());
    assert!(matches!(
        rows.err(),
        Some(Error::Query(DriverError::DeadlineExceeded))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panicking_driver_yields_aborted() {
    let (conn, shared) = open_mock().await;
    shared.open_gate();
    let tx = conn.begin().await.unwrap();
    let (future, _cancel) = tx.execute("PANIC", &[]);
    assert!(matches!(future.await.err(), Some(Error::Aborted)));
    tx.commit().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_driver_failure_is_captured_not_raised() {
    let (conn, _shared) = open_mock().await;
    let (future, _cancel) = conn.execute("FAIL", &[]);
    let result = future.await;
    assert!(matches!(result.err(), Some(Error::Exec(DriverError::Internal(_)))));
    assert!(result.rows_affected().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_statement_after_commit_fails_with_tx_done() {
    let (conn, _shared) = open_mock().await;
    let tx = conn.begin().await.unwrap();
    let stmt = tx.prepare("INSERT").await.unwrap();
    tx.commit().await.unwrap();

    let (future, _cancel) = stmt.execute(&[]);
    assert!(future.await.err().unwrap().is_tx_done());
    let (rows, _cancel) = stmt.query(&[]);
    assert!(rows.await.err().unwrap().is_tx_done());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_statement_close_waits_for_its_operations() {
    let (conn, shared) = open_mock().await;
    let stmt = conn.prepare("BLOCK").await.unwrap();
    assert!(!stmt.in_transaction());

    let (pending, _cancel) = stmt.execute(&[]);
    let close = tokio::spawn(stmt.close());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!close.is_finished());

    shared.open_gate();
    close.await.unwrap().unwrap();
    assert!(pending.await.err().is_none());
    assert_eq!(shared.log(), vec!["exec BLOCK", "stmt close"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_query_row_through_statement() {
    let (conn, _shared) = open_mock().await;
    let stmt = conn.prepare("SELECT id FROM t").await.unwrap();
    let (future, _cancel) = stmt.query_row(&[]);
    assert_eq!(future.await.scan::<i64>().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_errors() {
    let err = Connection::open("no-such-driver", "").await.unwrap_err();
    assert!(matches!(err, Error::UnknownDriver(ref name) if name == "no-such-driver"));

    let driver = Arc::new(MockDriver {
        shared: Arc::new(Shared::default()),
    });
    let err = Connection::open_with(driver, "unreachable").await.unwrap_err();
    assert!(matches!(err, Error::Open(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_open_through_registry() {
    let shared = Arc::new(Shared::default());
    asql_core::register(
        "mock-registry",
        Arc::new(MockDriver {
            shared: Arc::clone(&shared),
        }),
    );
    let conn = Connection::open("mock-registry", "mock").await.unwrap();
    assert_eq!(conn.driver_name(), "mock");
    conn.ping().await.unwrap();
    conn.close().await.unwrap();
    assert_eq!(shared.log(), vec!["close"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_load_script_missing_file_executes_nothing() {
    let (conn, shared) = open_mock().await;
    let err = conn
        .load_script("/definitely/not/here/schema.sql")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Read { .. }));
    assert!(shared.log().is_empty());
}
