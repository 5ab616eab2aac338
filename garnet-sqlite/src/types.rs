//! Conversions between Garnet values and SQLite values.

use rusqlite::types::{Value, ValueRef};
use serde_json::Value as JsonValue;

use garnet_query::filter::FilterValue;

/// Convert a filter value into a bound SQLite parameter.
pub fn filter_value_to_sqlite(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(b) => Value::Integer(i64::from(*b)),
        FilterValue::Int(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::String(s) => Value::Text(s.clone()),
        FilterValue::Json(_) | FilterValue::List(_) => Value::Text(value.to_json().to_string()),
    }
}

/// Convert an attribute value into a bound SQLite parameter.
///
/// Arrays and objects are stored as JSON text.
pub fn json_to_sqlite(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => Value::Text(value.to_string()),
    }
}

/// Convert a column value into an attribute value.
///
/// Text is always returned as a string, so values written by
/// [`json_to_sqlite`] read back unchanged; blobs become strings when they
/// are UTF-8 and byte arrays otherwise.
pub fn from_sqlite_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => JsonValue::String(text.to_string()),
            Err(_) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        },
    }
}

/// Read the value of column `index`, `null` when it cannot be read.
pub fn get_value_at_index(row: &rusqlite::Row<'_>, index: usize) -> JsonValue {
    row.get_ref(index)
        .map(from_sqlite_value)
        .unwrap_or(JsonValue::Null)
}
