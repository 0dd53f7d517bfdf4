//! Reading SQLite rows into asql rows.

use std::sync::Arc;

use asql_core::Row;

use crate::error::SqliteResult;
use crate::types::value_from_sqlite;

/// Column names of a prepared statement.
pub fn column_names(stmt: &rusqlite::Statement<'_>) -> Arc<[String]> {
    stmt.column_names().into_iter().map(String::from).collect()
}

/// Copy every column of the current SQLite row.
pub fn read_row(row: &rusqlite::Row<'_>, columns: &Arc<[String]>) -> SqliteResult<Row> {
    let values = (0..columns.len())
        .map(|i| row.get_ref(i).map(value_from_sqlite))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(Arc::clone(columns), values))
}
