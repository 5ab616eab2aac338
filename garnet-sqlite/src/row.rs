//! Row conversion for SQLite.

use garnet_query::Row;
use serde_json::Value as JsonValue;

use crate::types::get_value_at_index;

/// Conversion from a SQLite result row.
pub trait FromSqliteRow: Sized {
    /// Convert a SQLite row, given the statement's column names.
    fn from_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Self>;
}

impl FromSqliteRow for Row {
    fn from_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Self> {
        Ok(columns
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), get_value_at_index(row, index)))
            .collect())
    }
}

impl FromSqliteRow for JsonValue {
    fn from_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Self> {
        let row = Row::from_row(row, columns)?;
        Ok(JsonValue::Object(row.into_iter().collect()))
    }
}
