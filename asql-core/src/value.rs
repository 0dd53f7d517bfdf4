//! Argument and column values exchanged with drivers.
//!
//! ```rust
//! use asql_core::{args, FromValue, Value};
//!
//! let args = args![4, "jill", None::<i64>];
//! assert_eq!(args, vec![
//!     Value::Integer(4),
//!     Value::Text("jill".to_string()),
//!     Value::Null,
//! ]);
//!
//! assert_eq!(i64::from_value(&Value::Integer(7)).unwrap(), 7);
//! assert!(bool::from_value(&Value::Integer(1)).unwrap());
//! ```

use serde_json::Value as JsonValue;

use crate::error::{DriverError, DriverResult};

/// A single SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl Value {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    /// Convert to a JSON value. Blobs become arrays of bytes.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(i) => JsonValue::Number((*i).into()),
            Self::Real(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Blob(bytes) => {
                JsonValue::Array(bytes.iter().map(|b| JsonValue::Number((*b).into())).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Integer(i64::from(v))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Conversion from a column value into a Rust type.
pub trait FromValue: Sized {
    /// Convert the value, failing on type mismatch.
    fn from_value(value: &Value) -> DriverResult<Self>;
}

fn mismatch<T>(value: &Value, target: &str) -> DriverResult<T> {
    Err(DriverError::conversion(format!(
        "cannot convert {} value to {}",
        value.type_name(),
        target
    )))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> DriverResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> DriverResult<Self> {
        match value {
            Value::Integer(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            other => mismatch(other, "i64"),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> DriverResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide)
            .map_err(|_| DriverError::conversion(format!("integer {} out of range for i32", wide)))
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> DriverResult<Self> {
        let wide = i64::from_value(value)?;
        u64::try_from(wide)
            .map_err(|_| DriverError::conversion(format!("integer {} out of range for u64", wide)))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> DriverResult<Self> {
        match value {
            Value::Real(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            other => mismatch(other, "f64"),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> DriverResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            other => mismatch(other, "bool"),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> DriverResult<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Blob(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| DriverError::conversion(format!("blob is not valid UTF-8: {}", e))),
            other => mismatch(other, "String"),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> DriverResult<Self> {
        match value {
            Value::Blob(bytes) => Ok(bytes.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            other => mismatch(other, "Vec<u8>"),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> DriverResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Build a `Vec<Value>` of statement arguments.
///
/// ```rust
/// use asql_core::{args, Value};
///
/// let none: Vec<Value> = args![];
/// assert!(none.is_empty());
///
/// let some = args![1, 2.5, "three"];
/// assert_eq!(some.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(42i32), Value::Integer(42));
        assert_eq!(Value::from(7u8), Value::Integer(7));
        assert_eq!(Value::from("hi"), Value::Text("hi".into()));
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some(true)), Value::Bool(true));
    }

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(i32::from_value(&Value::Integer(12)).unwrap(), 12);
        assert!(i32::from_value(&Value::Integer(i64::MAX)).is_err());
        assert!(u64::from_value(&Value::Integer(-1)).is_err());
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = i64::from_value(&Value::Text("x".into())).unwrap_err();
        assert!(err.to_string().contains("cannot convert text value to i64"));
    }

    #[test]
    fn test_optional_values() {
        assert_eq!(Option::<i64>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(&Value::Integer(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Integer(1).to_json(), serde_json::json!(1));
        assert_eq!(Value::Text("a".into()).to_json(), serde_json::json!("a"));
        assert_eq!(Value::Real(f64::NAN).to_json(), JsonValue::Null);
    }

    #[test]
    fn test_args_macro() {
        let values = crate::args![3, "jack"];
        assert_eq!(values, vec![Value::Integer(3), Value::Text("jack".into())]);
    }
}
