//! Benchmarks for dispatching SQLite operations.
//!
//! Compares a direct driver call with the same call dispatched through a
//! connection or a transaction, to show the cost of the blocking-pool hop
//! and the completion barrier.

use std::sync::Arc;

use asql_core::{Connection, Context, DriverConnection, args};
use asql_sqlite::{SqliteConfig, SqliteConnection, SqliteDriver};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    );
";

async fn setup() -> Connection {
    let conn = Connection::open_with(Arc::new(SqliteDriver::new()), ":memory:")
        .await
        .unwrap();
    let (created, _) = conn.execute(SCHEMA, &[]);
    assert!(created.await.err().is_none());
    for i in 0..100 {
        let (inserted, _) = conn.execute(
            "INSERT INTO users (name) VALUES (?)",
            &args![format!("user {i}")],
        );
        assert!(inserted.await.err().is_none());
    }
    conn
}

fn bench_direct_driver(c: &mut Criterion) {
    let conn = SqliteConnection::open(SqliteConfig::memory()).unwrap();
    let ctx = Context::background();
    conn.exec(&ctx, SCHEMA, &[]).unwrap();
    conn.exec(&ctx, "INSERT INTO users (name) VALUES ('alice')", &[]).unwrap();

    c.bench_function("driver_query_row", |b| {
        b.iter(|| {
            let row = conn
                .query_row(&ctx, "SELECT name FROM users WHERE id = ?", &args![1])
                .unwrap();
            black_box(row);
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let conn = rt.block_on(setup());

    c.bench_function("dispatch_query_row", |b| {
        b.to_async(&rt).iter(|| async {
            let (row, _) = conn.query_row("SELECT name FROM users WHERE id = ?", &args![1]);
            black_box(row.await.scan::<String>().unwrap());
        });
    });

    c.bench_function("dispatch_query_all", |b| {
        b.to_async(&rt).iter(|| async {
            let (rows, _) = conn.query("SELECT id, name FROM users", &[]);
            black_box(rows.await.collect_rows::<(i64, String)>().unwrap());
        });
    });
}

fn bench_transaction_fan_out(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let conn = rt.block_on(setup());

    let mut group = c.benchmark_group("transaction_fan_out");
    for width in [1usize, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.to_async(&rt).iter(|| async {
                let tx = conn.begin().await.unwrap();
                let pending: Vec<_> = (0..width)
                    .map(|_| tx.execute("UPDATE users SET name = name WHERE id = 1", &[]).0)
                    .collect();
                tx.commit().await.unwrap();
                for result in futures::future::join_all(pending).await {
                    black_box(result.rows_affected().unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_direct_driver, bench_dispatch, bench_transaction_fan_out);
criterion_main!(benches);
