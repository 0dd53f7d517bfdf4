//! Materialized rows and row scanning.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{DriverError, DriverResult};
use crate::value::{FromValue, Value};

/// One row of a query result.
///
/// Column names are shared between all rows of the same cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from shared column names and its values.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Column names, in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The raw values, in select order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at a column index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Convert the value at a column index.
    pub fn get<T: FromValue>(&self, index: usize) -> DriverResult<T> {
        let value = self.values.get(index).ok_or_else(|| {
            DriverError::conversion(format!(
                "column index {} out of range for row of {} columns",
                index,
                self.values.len()
            ))
        })?;
        T::from_value(value).map_err(|e| match e {
            DriverError::Conversion(msg) => DriverError::conversion(format!(
                "column '{}': {}",
                self.columns.get(index).map(String::as_str).unwrap_or("?"),
                msg
            )),
            other => other,
        })
    }

    /// Convert the value of a named column.
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> DriverResult<T> {
        let index = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DriverError::conversion(format!("no column named '{}'", name)))?;
        self.get(index)
    }

    /// Consume the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Convert to a JSON object keyed by column name.
    pub fn to_json(&self) -> JsonValue {
        let map = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        JsonValue::Object(map)
    }
}

/// Conversion from a whole row into a Rust type.
///
/// Implemented for tuples of [`FromValue`] types (one element per column),
/// for single scalar types (one-column rows), and for [`Row`] itself.
pub trait FromRow: Sized {
    /// Convert the row.
    fn from_row(row: &Row) -> DriverResult<Self>;
}

fn expect_columns(row: &Row, expected: usize) -> DriverResult<()> {
    if row.len() != expected {
        return Err(DriverError::conversion(format!(
            "expected {} destination values in scan, row has {} columns",
            expected,
            row.len()
        )));
    }
    Ok(())
}

impl FromRow for Row {
    fn from_row(row: &Row) -> DriverResult<Self> {
        Ok(row.clone())
    }
}

impl FromRow for Vec<Value> {
    fn from_row(row: &Row) -> DriverResult<Self> {
        Ok(row.values.clone())
    }
}

impl FromRow for JsonValue {
    fn from_row(row: &Row) -> DriverResult<Self> {
        Ok(row.to_json())
    }
}

impl<T: FromValue> FromRow for Option<T> {
    fn from_row(row: &Row) -> DriverResult<Self> {
        expect_columns(row, 1)?;
        row.get(0)
    }
}

macro_rules! impl_from_row_scalar {
    ($($t:ty),*) => {
        $(
            impl FromRow for $t {
                fn from_row(row: &Row) -> DriverResult<Self> {
                    expect_columns(row, 1)?;
                    row.get(0)
                }
            }
        )*
    };
}

impl_from_row_scalar!(i64, i32, u64, f64, bool, String, Vec<u8>, Value);

macro_rules! impl_from_row_tuple {
    ($len:expr => $($idx:tt : $t:ident),+) => {
        impl<$($t: FromValue),+> FromRow for ($($t,)+) {
            fn from_row(row: &Row) -> DriverResult<Self> {
                expect_columns(row, $len)?;
                Ok(($(row.get::<$t>($idx)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(1 => 0: A);
impl_from_row_tuple!(2 => 0: A, 1: B);
impl_from_row_tuple!(3 => 0: A, 1: B, 2: C);
impl_from_row_tuple!(4 => 0: A, 1: B, 2: C, 3: D);
impl_from_row_tuple!(5 => 0: A, 1: B, 2: C, 3: D, 4: E);
impl_from_row_tuple!(6 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F);
