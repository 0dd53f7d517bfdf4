//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use asql::Connection;

/// Path of the seed script: `test_table` with ids 1 (alice) and 2 (bob).
pub fn schema_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/schema.sql")
}

/// Route log output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Open a private in-memory database.
pub async fn open_memory() -> Connection {
    init_tracing();
    asql::open("sqlite", "file::memory:").await.unwrap()
}

/// Open a private in-memory database seeded with the test schema.
pub async fn open_seeded() -> Connection {
    let conn = open_memory().await;
    conn.load_script(schema_path()).await.unwrap();
    conn
}

/// Count the rows of `test_table`.
pub async fn count_rows(conn: &Connection) -> i64 {
    let (row, _) = conn.query_row("SELECT count(*) FROM test_table", &[]);
    row.await.scan().unwrap()
}
