//! The select description handed to execution engines.

use crate::filter::{Filter, FilterValue, quote_ident};
use crate::types::{OrderByField, SortOrder};

/// A single-table select: every fetch the model layer issues, including the
/// batched relation fetches, is expressed as one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Table to read from.
    pub table: String,
    /// WHERE condition.
    pub filter: Filter,
    /// ORDER BY columns, in priority order.
    pub order_by: Vec<OrderByField>,
    /// LIMIT.
    pub limit: Option<u64>,
    /// OFFSET.
    pub offset: Option<u64>,
}

impl SelectQuery {
    /// Select every row of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: Filter::None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// AND a condition onto the current filter.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = std::mem::take(&mut self.filter).and_then(filter.into());
        self
    }

    /// Append an ORDER BY column.
    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push(OrderByField::new(column, order));
        self
    }

    /// Set the LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Set the OFFSET.
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Build the SQL statement and its bound parameters.
    pub fn to_sql(&self) -> (String, Vec<FilterValue>) {
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table));

        let (where_sql, params) = self.filter.to_sql(0);
        if !self.filter.is_none() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            for (i, field) in self.order_by.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                field.write_sql(&mut sql);
            }
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        (sql, params)
    }
}
