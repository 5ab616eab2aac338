//! Filter types for building WHERE clauses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A filter value that can be used in comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value.
    Json(serde_json::Value),
    /// List of values.
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert an attribute value into a filter value.
    ///
    /// Integral numbers become [`FilterValue::Int`]; objects stay JSON.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(_) => Self::Json(value.clone()),
        }
    }

    /// Convert back into an attribute value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
            Self::Json(v) => v.clone(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for FilterValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        Self::from_json(&v)
    }
}

impl From<&Value> for FilterValue {
    fn from(v: &Value) -> Self {
        Self::from_json(v)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A complete filter that can be converted to SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison.
    Equals(String, FilterValue),
    /// Not equals comparison.
    NotEquals(String, FilterValue),

    /// Less than comparison.
    Lt(String, FilterValue),
    /// Less than or equal comparison.
    Lte(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Greater than or equal comparison.
    Gte(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an equality filter.
    pub fn equals(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Equals(column.into(), value.into())
    }

    /// Create a set-membership filter on `column`.
    ///
    /// A single value collapses into an equality test, which is what batch
    /// relation fetches issue for a one-parent result set.
    pub fn column_in(column: impl Into<String>, mut values: Vec<FilterValue>) -> Self {
        let column = column.into();
        if values.len() == 1 {
            if let Some(value) = values.pop() {
                return Self::Equals(column, value);
            }
        }
        Self::In(column, values)
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.pop().unwrap_or_default(),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.pop().unwrap_or_default(),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Generate SQL for this filter with `?N` parameter placeholders.
    ///
    /// `param_offset` is the number of parameters already bound ahead of this
    /// clause. Returns (sql, params) where params are the values to bind.
    pub fn to_sql(&self, param_offset: usize) -> (String, Vec<FilterValue>) {
        let mut params = Vec::new();
        let sql = self.to_sql_with_params(param_offset, &mut params);
        (sql, params)
    }

    fn to_sql_with_params(&self, offset: usize, params: &mut Vec<FilterValue>) -> String {
        let bind = |value: &FilterValue, params: &mut Vec<FilterValue>| {
            params.push(value.clone());
            format!("?{}", offset + params.len())
        };

        match self {
            Self::None => "1 = 1".to_string(),

            Self::Equals(col, val) => {
                if val.is_null() {
                    format!("{} IS NULL", quote_ident(col))
                } else {
                    format!("{} = {}", quote_ident(col), bind(val, params))
                }
            }
            Self::NotEquals(col, val) => {
                if val.is_null() {
                    format!("{} IS NOT NULL", quote_ident(col))
                } else {
                    format!("{} != {}", quote_ident(col), bind(val, params))
                }
            }

            Self::Lt(col, val) => format!("{} < {}", quote_ident(col), bind(val, params)),
            Self::Lte(col, val) => format!("{} <= {}", quote_ident(col), bind(val, params)),
            Self::Gt(col, val) => format!("{} > {}", quote_ident(col), bind(val, params)),
            Self::Gte(col, val) => format!("{} >= {}", quote_ident(col), bind(val, params)),

            Self::In(col, values) => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                let placeholders: Vec<_> = values.iter().map(|v| bind(v, params)).collect();
                format!("{} IN ({})", quote_ident(col), placeholders.join(", "))
            }

            Self::IsNull(col) => format!("{} IS NULL", quote_ident(col)),
            Self::IsNotNull(col) => format!("{} IS NOT NULL", quote_ident(col)),

            Self::And(filters) => {
                if filters.is_empty() {
                    return "1 = 1".to_string();
                }
                let parts: Vec<_> = filters
                    .iter()
                    .map(|f| f.to_sql_with_params(offset, params))
                    .collect();
                format!("({})", parts.join(" AND "))
            }
            Self::Or(filters) => {
                if filters.is_empty() {
                    return "1 = 0".to_string();
                }
                let parts: Vec<_> = filters
                    .iter()
                    .map(|f| f.to_sql_with_params(offset, params))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
            Self::Not(filter) => {
                let inner = filter.to_sql_with_params(offset, params);
                format!("NOT ({})", inner)
            }
        }
    }
}

/// Quote an identifier for use in generated SQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_value_from() {
        assert_eq!(FilterValue::from(42i32), FilterValue::Int(42));
        assert_eq!(FilterValue::from("hello"), FilterValue::String("hello".to_string()));
        assert_eq!(FilterValue::from(true), FilterValue::Bool(true));
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
    }

    #[test]
    fn test_filter_value_json_conversion() {
        assert_eq!(FilterValue::from_json(&json!(7)), FilterValue::Int(7));
        assert_eq!(FilterValue::from_json(&json!(1.5)), FilterValue::Float(1.5));
        assert_eq!(FilterValue::from_json(&json!(null)), FilterValue::Null);
        assert_eq!(FilterValue::String("x".into()).to_json(), json!("x"));
        assert_eq!(FilterValue::Int(3).to_json(), json!(3));
    }

    #[test]
    fn test_filter_equals() {
        let (sql, params) = Filter::equals("email", "test@example.com").to_sql(0);
        assert_eq!(sql, "\"email\" = ?1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_equals_null_renders_is_null() {
        let (sql, params) = Filter::equals("place_id", FilterValue::Null).to_sql(0);
        assert_eq!(sql, "\"place_id\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_filter_and() {
        let f1 = Filter::equals("name", "Alice");
        let f2 = Filter::Gt("age".to_string(), FilterValue::Int(18));
        let combined = Filter::and([f1, f2]);

        let (sql, params) = combined.to_sql(0);
        assert_eq!(sql, "(\"name\" = ?1 AND \"age\" > ?2)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_filter_offset() {
        let (sql, _) = Filter::equals("id", 1).to_sql(3);
        assert_eq!(sql, "\"id\" = ?4");
    }

    #[test]
    fn test_filter_not() {
        let filter = Filter::not(Filter::equals("deleted", true));
        let (sql, _) = filter.to_sql(0);
        assert_eq!(sql, "NOT (\"deleted\" = ?1)");
    }

    #[test]
    fn test_filter_in() {
        let filter = Filter::In("id".to_string(), vec![1.into(), 2.into()]);
        let (sql, params) = filter.to_sql(0);
        assert_eq!(sql, "\"id\" IN (?1, ?2)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let (sql, params) = Filter::In("id".to_string(), vec![]).to_sql(0);
        assert_eq!(sql, "1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_column_in_collapses_single_value() {
        assert_eq!(Filter::column_in("id", vec![5.into()]), Filter::equals("id", 5));
        assert_eq!(
            Filter::column_in("id", vec![5.into(), 6.into()]),
            Filter::In("id".to_string(), vec![5.into(), 6.into()])
        );
    }

    #[test]
    fn test_and_then_skips_none() {
        let f = Filter::none().and_then(Filter::equals("a", 1));
        assert_eq!(f, Filter::equals("a", 1));
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
