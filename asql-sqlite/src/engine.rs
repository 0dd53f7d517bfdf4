//! Statement execution on a native SQLite connection.
//!
//! These functions run on the blocking pool with the connection lock held.
//! The operation context is checked before any work starts, between the
//! statements of a batch, and between rows.

use asql_core::{BufferedCursor, Context, ExecSummary, Value};
use rusqlite::Connection;
use tracing::trace;

use crate::error::{SqliteError, SqliteResult};
use crate::row::{column_names, read_row};
use crate::types::params;

/// Execute `sql`, expecting no rows.
///
/// Without arguments the text may hold several statements, which run in
/// order; the reported row count is the last statement's. With arguments
/// it must be a single statement.
pub fn exec(
    conn: &Connection,
    ctx: &Context,
    sql: &str,
    args: &[Value],
) -> SqliteResult<ExecSummary> {
    ctx.check()?;

    let changed = if args.is_empty() {
        exec_batch(conn, ctx, sql)?
    } else {
        let mut stmt = conn.prepare_cached(sql)?;
        stmt.execute(params(args))? as u64
    };

    let summary = ExecSummary::new(changed, Some(conn.last_insert_rowid()));
    trace!(rows_affected = summary.rows_affected, "exec finished");
    Ok(summary)
}

fn exec_batch(conn: &Connection, ctx: &Context, sql: &str) -> SqliteResult<u64> {
    let mut batch = rusqlite::Batch::new(conn, sql);
    let mut changed = 0;
    while let Some(mut stmt) = batch.next()? {
        ctx.check()?;
        changed = match stmt.execute([]) {
            Ok(n) => n as u64,
            // Statements such as `PRAGMA journal_mode` answer with a row.
            Err(rusqlite::Error::ExecuteReturnedResults) => 0,
            Err(e) => return Err(SqliteError::from(e)),
        };
    }
    Ok(changed)
}

/// Run a query and read its rows.
///
/// A failure while stepping through the rows, including a cancelled
/// context, ends the read; the rows read so far are kept and the error is
/// reported by the cursor once they are consumed.
pub fn query(
    conn: &Connection,
    ctx: &Context,
    sql: &str,
    args: &[Value],
) -> SqliteResult<BufferedCursor> {
    ctx.check()?;

    let mut stmt = conn.prepare_cached(sql)?;
    let columns = column_names(&stmt);
    let mut rows = stmt.query(params(args))?;

    let mut out = Vec::new();
    loop {
        if let Err(err) = ctx.check() {
            return Ok(BufferedCursor::with_error(columns, out, err));
        }
        match rows.next() {
            Ok(Some(row)) => out.push(read_row(row, &columns)?),
            Ok(None) => break,
            Err(e) => {
                return Ok(BufferedCursor::with_error(columns, out, SqliteError::from(e).into()));
            }
        }
    }

    trace!(rows = out.len(), "query finished");
    Ok(BufferedCursor::new(columns, out))
}

/// Check that `sql` compiles, leaving it in the statement cache.
pub fn prepare(conn: &Connection, ctx: &Context, sql: &str) -> SqliteResult<()> {
    ctx.check()?;
    conn.prepare_cached(sql)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asql_core::{DriverError, ExecOutcome, RowCursor, args};

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO t (id, name) VALUES (1, 'alice'), (2, 'bob');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_exec_with_args() {
        let conn = memory();
        let summary = exec(
            &conn,
            &Context::background(),
            "INSERT INTO t (id, name) VALUES (?, ?)",
            &args![3, "carol"],
        )
        .unwrap();
        assert_eq!(summary.rows_affected().unwrap(), 1);
        assert_eq!(summary.last_insert_id().unwrap(), 3);
    }

    #[test]
    fn test_exec_batch_runs_every_statement() {
        let conn = memory();
        let summary = exec(
            &conn,
            &Context::background(),
            "PRAGMA journal_mode = MEMORY; UPDATE t SET name = 'x'; DELETE FROM t WHERE id = 1;",
            &[],
        )
        .unwrap();
        assert_eq!(summary.rows_affected().unwrap(), 1);
        let names: i64 = conn
            .query_row("SELECT COUNT(*) FROM t WHERE name = 'x'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(names, 1);
    }

    #[test]
    fn test_query_reads_rows_in_order() {
        let conn = memory();
        let mut cursor = query(
            &conn,
            &Context::background(),
            "SELECT id, name FROM t ORDER BY id",
            &[],
        )
        .unwrap();
        assert_eq!(cursor.columns(), ["id".to_string(), "name".to_string()]);
        let mut ids = Vec::new();
        while cursor.advance() {
            ids.push(cursor.current().unwrap().get::<i64>(0).unwrap());
        }
        assert_eq!(ids, vec![1, 2]);
        assert!(cursor.err().is_none());
    }

    #[test]
    fn test_cancelled_context_does_no_work() {
        let conn = memory();
        let ctx = Context::background();
        ctx.cancel();
        let err = exec(&conn, &ctx, "DELETE FROM t", &[]).unwrap_err();
        assert!(matches!(err, SqliteError::Driver(DriverError::Cancelled)));
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_prepare_rejects_bad_sql() {
        let conn = memory();
        assert!(prepare(&conn, &Context::background(), "SELEC nonsense").is_err());
        assert!(prepare(&conn, &Context::background(), "SELECT name FROM t WHERE id = ?").is_ok());
    }
}
