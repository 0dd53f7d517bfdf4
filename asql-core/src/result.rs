//! Outcomes delivered by dispatched operations.
//!
//! Each wrapper holds either the driver's outcome or the error that
//! replaced it. The error is only set when the operation failed.

use std::fmt;

use crate::dispatch::Outcome;
use crate::driver::{ExecOutcome, RowCursor};
use crate::error::{DriverError, DriverResult, Error, Result};
use crate::row::{FromRow, Row};

/// The outcome of an execute operation.
pub struct ExecResult {
    outcome: std::result::Result<Box<dyn ExecOutcome>, Error>,
}

impl ExecResult {
    pub(crate) fn new(outcome: DriverResult<Box<dyn ExecOutcome>>) -> Self {
        Self {
            outcome: outcome.map_err(Error::Exec),
        }
    }

    /// Number of rows changed by the statement.
    pub fn rows_affected(&self) -> Result<u64> {
        match &self.outcome {
            Ok(outcome) => outcome.rows_affected().map_err(Error::Exec),
            Err(err) => Err(err.clone()),
        }
    }

    /// Row id generated by the statement.
    pub fn last_insert_id(&self) -> Result<i64> {
        match &self.outcome {
            Ok(outcome) => outcome.last_insert_id().map_err(Error::Exec),
            Err(err) => Err(err.clone()),
        }
    }

    /// The error the operation failed with, if it failed.
    pub fn err(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl Outcome for ExecResult {
    fn aborted() -> Self {
        Self {
            outcome: Err(Error::Aborted),
        }
    }
}

impl fmt::Debug for ExecResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecResult")
            .field("rows_affected", &self.rows_affected().ok())
            .field("err", &self.err())
            .finish()
    }
}

/// The outcome of a query operation: a forward-only set of rows.
///
/// ```rust,ignore
/// let (future, _cancel) = conn.query("SELECT id, name FROM users", &[]);
/// let mut rows = future.await;
/// while rows.next() {
///     let (id, name): (i64, String) = rows.scan()?;
/// }
/// if let Some(err) = rows.err() {
///     return Err(err);
/// }
/// ```
pub struct RowSet {
    cursor: Option<Box<dyn RowCursor>>,
    err: Option<Error>,
}

impl RowSet {
    pub(crate) fn new(outcome: DriverResult<Box<dyn RowCursor>>) -> Self {
        match outcome {
            Ok(cursor) => Self {
                cursor: Some(cursor),
                err: None,
            },
            Err(err) => Self {
                cursor: None,
                err: Some(Error::Query(err)),
            },
        }
    }

    /// Advance to the next row. Returns `false` when the rows are exhausted,
    /// the operation failed, or the cursor hit an error.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        match &mut self.cursor {
            Some(cursor) if self.err.is_none() => cursor.advance(),
            _ => false,
        }
    }

    /// Column names of the result. Empty when the operation failed.
    pub fn columns(&self) -> &[String] {
        match &self.cursor {
            Some(cursor) => cursor.columns(),
            None => &[],
        }
    }

    /// The current row, after a successful [`next`](Self::next).
    pub fn row(&self) -> Option<&Row> {
        self.cursor.as_ref().and_then(|c| c.current())
    }

    /// Convert the current row.
    ///
    /// Fails when called before the first `next`, after the last row, or
    /// when the operation itself failed.
    pub fn scan<T: FromRow>(&self) -> Result<T> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let row = self.row().ok_or_else(|| {
            Error::Scan(DriverError::conversion(
                "scan called without a current row; call next first",
            ))
        })?;
        T::from_row(row).map_err(Error::Scan)
    }

    /// The captured operation error, or else the error that stopped
    /// iteration.
    pub fn err(&self) -> Option<Error> {
        if let Some(err) = &self.err {
            return Some(err.clone());
        }
        self.cursor
            .as_ref()
            .and_then(|c| c.err())
            .cloned()
            .map(Error::Query)
    }

    /// Release the cursor before it is exhausted.
    pub fn close(&mut self) -> Result<()> {
        match &mut self.cursor {
            Some(cursor) => cursor.close().map_err(Error::Close),
            None => Ok(()),
        }
    }

    /// Read every remaining row, then report any error.
    pub fn collect_rows<T: FromRow>(mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while self.next() {
            out.push(self.scan()?);
        }
        match self.err() {
            Some(err) => Err(err),
            None => Ok(out),
        }
    }
}

impl Outcome for RowSet {
    fn aborted() -> Self {
        Self {
            cursor: None,
            err: Some(Error::Aborted),
        }
    }
}

impl fmt::Debug for RowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowSet")
            .field("columns", &self.columns())
            .field("err", &self.err)
            .finish()
    }
}

/// The outcome of a single-row query.
///
/// A query that failed and a query that matched nothing both surface
/// through [`err`](Self::err) and [`scan`](Self::scan); the latter reports
/// [`DriverError::NoRows`].
#[derive(Debug)]
pub struct SingleRow {
    outcome: std::result::Result<Row, Error>,
}

impl SingleRow {
    pub(crate) fn new(outcome: DriverResult<Row>) -> Self {
        Self {
            outcome: outcome.map_err(Error::Query),
        }
    }

    /// Convert the row.
    pub fn scan<T: FromRow>(&self) -> Result<T> {
        match &self.outcome {
            Ok(row) => T::from_row(row).map_err(Error::Scan),
            Err(err) => Err(err.clone()),
        }
    }

    /// The error the operation failed with, if it failed.
    pub fn err(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    /// The row, if the query produced one.
    pub fn row(&self) -> Option<&Row> {
        self.outcome.as_ref().ok()
    }

    /// Take the row or the error.
    pub fn into_row(self) -> Result<Row> {
        self.outcome
    }
}

impl Outcome for SingleRow {
    fn aborted() -> Self {
        Self {
            outcome: Err(Error::Aborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{BufferedCursor, ExecSummary};
    use crate::value::Value;
    use std::sync::Arc;

    fn cursor(ids: &[i64]) -> Box<dyn RowCursor> {
        let columns: Arc<[String]> = Arc::from(vec!["id".to_string()]);
        let rows = ids
            .iter()
            .map(|id| Row::new(Arc::clone(&columns), vec![Value::Integer(*id)]))
            .collect();
        Box::new(BufferedCursor::new(columns, rows))
    }

    #[test]
    fn test_exec_result_success_has_no_error() {
        let result = ExecResult::new(Ok(Box::new(ExecSummary::new(3, Some(9)))));
        assert!(result.err().is_none());
        assert_eq!(result.rows_affected().unwrap(), 3);
        assert_eq!(result.last_insert_id().unwrap(), 9);
    }

    #[test]
    fn test_exec_result_failure() {
        let result = ExecResult::new(Err(DriverError::TxDone));
        assert!(result.err().unwrap().is_tx_done());
        assert!(result.rows_affected().unwrap_err().is_tx_done());
    }

    #[test]
    fn test_rowset_iteration() {
        let mut rows = RowSet::new(Ok(cursor(&[1, 2])));
        assert!(rows.scan::<i64>().is_err());
        let mut seen = Vec::new();
        while rows.next() {
            seen.push(rows.scan::<i64>().unwrap());
        }
        assert_eq!(seen, vec![1, 2]);
        assert!(rows.err().is_none());
        assert!(rows.scan::<i64>().is_err());
    }

    #[test]
    fn test_rowset_captured_error() {
        let mut rows = RowSet::new(Err(DriverError::Cancelled));
        assert!(!rows.next());
        assert!(rows.columns().is_empty());
        assert!(rows.err().unwrap().is_cancelled());
    }

    #[test]
    fn test_rowset_falls_back_to_cursor_error() {
        let columns: Arc<[String]> = Arc::from(vec!["id".to_string()]);
        let cursor = BufferedCursor::with_error(columns, Vec::new(), DriverError::DeadlineExceeded);
        let mut rows = RowSet::new(Ok(Box::new(cursor)));
        assert!(!rows.next());
        assert!(matches!(rows.err(), Some(Error::Query(DriverError::DeadlineExceeded))));
    }

    #[test]
    fn test_collect_rows() {
        let rows = RowSet::new(Ok(cursor(&[5, 6, 7])));
        assert_eq!(rows.collect_rows::<i64>().unwrap(), vec![5, 6, 7]);
    }

    #[test]
    fn test_single_row() {
        let columns: Arc<[String]> = Arc::from(vec!["name".to_string()]);
        let row = SingleRow::new(Ok(Row::new(columns, vec![Value::Text("bob".into())])));
        assert_eq!(row.scan::<String>().unwrap(), "bob");
        assert!(row.err().is_none());

        let missing = SingleRow::new(Err(DriverError::NoRows));
        assert!(missing.scan::<String>().unwrap_err().is_no_rows());
        assert!(missing.err().unwrap().is_no_rows());
    }

    #[test]
    fn test_aborted_outcomes() {
        assert!(matches!(ExecResult::aborted().err(), Some(Error::Aborted)));
        assert!(matches!(RowSet::aborted().err(), Some(Error::Aborted)));
        assert!(matches!(SingleRow::aborted().err(), Some(Error::Aborted)));
    }
}
