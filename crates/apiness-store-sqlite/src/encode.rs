//! Conversions between table cells, SQLite values and JSON.

use apiness_core::table::Cell;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// Booleans are stored as `0`/`1`.
pub fn encode_cell(cell: &Cell) -> SqlValue {
  match cell {
    Cell::Null => SqlValue::Null,
    Cell::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Cell::Integer(i) => SqlValue::Integer(*i),
    Cell::Real(r) => SqlValue::Real(*r),
    Cell::Text(s) => SqlValue::Text(s.clone()),
  }
}

/// Non-finite reals have no JSON form and decode as `null`.
pub fn decode_value(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::from(i),
    ValueRef::Real(r) => Number::from_f64(r).map_or(Value::Null, Value::Number),
    ValueRef::Text(t) | ValueRef::Blob(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
  }
}
