//! Value and row types for statement results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of data from a statement result.
pub type Row = Vec<Value>;

/// What a single statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutput {
    /// The statement produced a row set (possibly empty).
    Rows(Vec<Row>),
    /// The statement produced no row set; carries the affected row count.
    Affected(u64),
}

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// One-dimensional array.
    Array(Vec<Value>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to its plain string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
            Value::Array(items) => {
                let items = items
                    .iter()
                    .map(Value::to_row_literal)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{items}]")
            }
        }
    }

    /// Representation used inside a rendered row: text is single-quoted with
    /// embedded quotes doubled, as in a SQL literal.
    fn to_row_literal(&self) -> String {
        match self {
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_display_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// Renders a row as `(v1, v2, ...)`.
///
/// A single column renders as `(v)`, without a trailing comma.
pub fn render_row(row: &Row) -> String {
    let values = row
        .iter()
        .map(Value::to_row_literal)
        .collect::<Vec<_>>()
        .join(", ");
    format!("({values})")
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
