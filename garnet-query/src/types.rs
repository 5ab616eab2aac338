//! Common types used in query building.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter::quote_ident;

/// A row exchanged with an execution engine: column name to value, in
/// column order.
pub type Row = IndexMap<String, serde_json::Value>;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Order by specification for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// The column name to order by.
    pub column: String,
    /// The sort order.
    pub order: SortOrder,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Write the SQL for this field into `buffer`.
    ///
    /// ```rust
    /// use garnet_query::OrderByField;
    ///
    /// let mut buffer = String::from("ORDER BY ");
    /// OrderByField::desc("id").write_sql(&mut buffer);
    /// assert_eq!(buffer, "ORDER BY \"id\" DESC");
    /// ```
    pub fn write_sql(&self, buffer: &mut String) {
        buffer.push_str(&quote_ident(&self.column));
        buffer.push(' ');
        buffer.push_str(self.order.as_sql());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_sql() {
        assert_eq!(SortOrder::Asc.as_sql(), "ASC");
        assert_eq!(SortOrder::Desc.to_string(), "DESC");
        assert_eq!(SortOrder::default(), SortOrder::Asc);
    }

    #[test]
    fn test_order_by_field() {
        let field = OrderByField::asc("name");
        let mut sql = String::new();
        field.write_sql(&mut sql);
        assert_eq!(sql, "\"name\" ASC");
    }
}
