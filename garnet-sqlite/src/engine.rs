//! SQLite query engine implementation.

use std::sync::Arc;

use rusqlite::types::Value;
use serde_json::Value as JsonValue;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, instrument};

use garnet_query::error::{QueryError, QueryResult};
use garnet_query::filter::{Filter, quote_ident};
use garnet_query::traits::{BoxFuture, QueryEngine};
use garnet_query::transaction::{TransactionMode, Transactional};
use garnet_query::{Row, SelectQuery};

use crate::config::SqliteConfig;
use crate::connection::SqliteConnection;
use crate::error::SqliteResult;
use crate::stats::{QueryStats, StatementKind, StatsSnapshot};
use crate::transaction::SqliteTransaction;
use crate::types::{filter_value_to_sqlite, json_to_sqlite};

/// Render a select with its bound parameters.
pub fn build_select(query: &SelectQuery) -> (String, Vec<Value>) {
    let (sql, params) = query.to_sql();
    (sql, params.iter().map(filter_value_to_sqlite).collect())
}

/// Render an insert of `values` into `table`.
pub fn build_insert(table: &str, values: &Row) -> (String, Vec<Value>) {
    if values.is_empty() {
        return (
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table)),
            Vec::new(),
        );
    }

    let columns: Vec<String> = values.keys().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    );
    (sql, values.values().map(json_to_sqlite).collect())
}

/// Render an update of `values` on the rows matching `filter`.
pub fn build_update(table: &str, values: &Row, filter: &Filter) -> (String, Vec<Value>) {
    let assignments: Vec<String> = values
        .keys()
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", quote_ident(column), i + 1))
        .collect();
    let mut sql = format!("UPDATE {} SET {}", quote_ident(table), assignments.join(", "));
    let mut params: Vec<Value> = values.values().map(json_to_sqlite).collect();

    if !filter.is_none() {
        let (where_sql, where_params) = filter.to_sql(params.len());
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
        params.extend(where_params.iter().map(filter_value_to_sqlite));
    }
    (sql, params)
}

/// Render a delete of the rows matching `filter`.
pub fn build_delete(table: &str, filter: &Filter) -> (String, Vec<Value>) {
    let mut sql = format!("DELETE FROM {}", quote_ident(table));
    let mut params = Vec::new();

    if !filter.is_none() {
        let (where_sql, where_params) = filter.to_sql(0);
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
        params.extend(where_params.iter().map(filter_value_to_sqlite));
    }
    (sql, params)
}

/// State shared by an engine, its clones and its transactions.
pub(crate) struct EngineInner {
    pub(crate) config: SqliteConfig,
    pub(crate) conn: SqliteConnection,
    /// One permit: held per statement by the engine, and for the whole
    /// lifetime of a transaction.
    pub(crate) gate: Arc<Semaphore>,
    pub(crate) stats: QueryStats,
}

impl EngineInner {
    #[instrument(skip_all, fields(table = %query.table))]
    pub(crate) async fn select(&self, query: &SelectQuery) -> QueryResult<Vec<Row>> {
        let (sql, params) = build_select(query);
        debug!(sql = %sql, "Executing select");

        self.stats.record(StatementKind::Select);
        let rows = self.conn.query_params::<Row>(&sql, params).await?;
        debug!(rows = rows.len(), "Select returned");
        Ok(rows)
    }

    #[instrument(skip(self, values), fields(columns = values.len()))]
    pub(crate) async fn insert(
        &self,
        table: &str,
        values: &Row,
        key_column: &str,
    ) -> QueryResult<JsonValue> {
        let (sql, params) = build_insert(table, values);
        debug!(sql = %sql, "Executing insert");

        self.stats.record(StatementKind::Insert);
        let rowid = self.conn.execute_insert_params(&sql, params).await?;
        Ok(values
            .get(key_column)
            .filter(|key| !key.is_null())
            .cloned()
            .unwrap_or_else(|| JsonValue::from(rowid)))
    }

    #[instrument(skip(self, values, filter), fields(columns = values.len()))]
    pub(crate) async fn update(&self, table: &str, values: &Row, filter: &Filter) -> QueryResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        let (sql, params) = build_update(table, values, filter);
        debug!(sql = %sql, "Executing update");

        self.stats.record(StatementKind::Update);
        let affected = self.conn.execute_params(&sql, params).await?;
        Ok(affected as u64)
    }

    #[instrument(skip(self, filter))]
    pub(crate) async fn delete(&self, table: &str, filter: &Filter) -> QueryResult<u64> {
        let (sql, params) = build_delete(table, filter);
        debug!(sql = %sql, "Executing delete");

        self.stats.record(StatementKind::Delete);
        let affected = self.conn.execute_params(&sql, params).await?;
        Ok(affected as u64)
    }
}

/// SQLite query engine.
///
/// A single connection serves every statement. Clones share it, along with
/// the statement counters. While a transaction is open, statements issued
/// through the engine itself (rather than the transaction) wait for it to
/// finish.
///
/// ```rust,ignore
/// let engine = SqliteEngine::open(SqliteConfig::memory()).await?;
/// engine.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").await?;
/// let users = User::find_many(&engine).include("things").exec().await?;
/// ```
#[derive(Clone)]
pub struct SqliteEngine {
    inner: Arc<EngineInner>,
}

impl SqliteEngine {
    /// Open the database described by `config`.
    pub async fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = SqliteConnection::open(&config).await?;
        info!(path = %config.path.display(), "SQLite engine ready");

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                conn,
                gate: Arc::new(Semaphore::new(1)),
                stats: QueryStats::new(),
            }),
        })
    }

    /// Open a private in-memory database.
    pub async fn memory() -> SqliteResult<Self> {
        Self::open(SqliteConfig::memory()).await
    }

    /// Get the configuration.
    pub fn config(&self) -> &SqliteConfig {
        &self.inner.config
    }

    /// Statement counts since the engine was opened or last reset.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Reset the statement counters, returning the counts before the reset.
    pub fn reset_stats(&self) -> StatsSnapshot {
        self.inner.stats.reset()
    }

    /// Run schema or seed statements separated by semicolons.
    ///
    /// Batches are not counted in [`stats`](Self::stats).
    pub async fn execute_batch(&self, sql: &str) -> QueryResult<()> {
        let _permit = self.acquire().await?;
        self.inner.conn.execute_batch(sql).await?;
        Ok(())
    }

    async fn acquire(&self) -> QueryResult<SemaphorePermit<'_>> {
        self.inner
            .gate
            .acquire()
            .await
            .map_err(|_| QueryError::connection("SQLite engine is closed"))
    }
}

impl QueryEngine for SqliteEngine {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        Box::pin(async move {
            let _permit = self.acquire().await?;
            self.inner.select(query).await
        })
    }

    fn insert<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        key_column: &'a str,
    ) -> BoxFuture<'a, QueryResult<JsonValue>> {
        Box::pin(async move {
            let _permit = self.acquire().await?;
            self.inner.insert(table, values, key_column).await
        })
    }

    fn update<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        filter: &'a Filter,
    ) -> BoxFuture<'a, QueryResult<u64>> {
        Box::pin(async move {
            let _permit = self.acquire().await?;
            self.inner.update(table, values, filter).await
        })
    }

    fn delete<'a>(&'a self, table: &'a str, filter: &'a Filter) -> BoxFuture<'a, QueryResult<u64>> {
        Box::pin(async move {
            let _permit = self.acquire().await?;
            self.inner.delete(table, filter).await
        })
    }
}

impl Transactional for SqliteEngine {
    type Transaction = SqliteTransaction;

    fn begin_with(&self, mode: TransactionMode) -> BoxFuture<'_, QueryResult<SqliteTransaction>> {
        Box::pin(async move { SqliteTransaction::begin(self.inner.clone(), mode).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_query::FilterValue;
    use serde_json::json;

    fn row(pairs: &[(&str, JsonValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_build_select_binds_in_list() {
        let query = SelectQuery::new("things").r#where(Filter::In(
            "user_id".into(),
            vec![FilterValue::Int(1), FilterValue::Int(2)],
        ));
        let (sql, params) = build_select(&query);
        assert_eq!(sql, "SELECT * FROM \"things\" WHERE \"user_id\" IN (?1, ?2)");
        assert_eq!(params, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_build_insert() {
        let (sql, params) = build_insert("users", &row(&[("name", json!("Jane")), ("place_id", json!(2))]));
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"name\", \"place_id\") VALUES (?1, ?2)"
        );
        assert_eq!(params, vec![Value::Text("Jane".into()), Value::Integer(2)]);

        let (sql, params) = build_insert("users", &Row::new());
        assert_eq!(sql, "INSERT INTO \"users\" DEFAULT VALUES");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_update_numbers_where_after_set() {
        let (sql, params) = build_update(
            "users",
            &row(&[("name", json!("Billy Idol"))]),
            &Filter::equals("id", 3),
        );
        assert_eq!(sql, "UPDATE \"users\" SET \"name\" = ?1 WHERE \"id\" = ?2");
        assert_eq!(params, vec![Value::Text("Billy Idol".into()), Value::Integer(3)]);
    }

    #[test]
    fn test_build_delete() {
        let (sql, params) = build_delete("things", &Filter::equals("id", 2));
        assert_eq!(sql, "DELETE FROM \"things\" WHERE \"id\" = ?1");
        assert_eq!(params, vec![Value::Integer(2)]);

        let (sql, _) = build_delete("things", &Filter::None);
        assert_eq!(sql, "DELETE FROM \"things\"");
    }
}
