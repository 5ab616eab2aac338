//! SQLite connection wrapper.

use rusqlite::types::Value;
use tokio_rusqlite::Connection;
use tracing::{debug, trace};

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::row::FromSqliteRow;

/// An asynchronous handle to one SQLite connection.
///
/// Statements run on the connection's background thread; the handle is
/// cheap to clone and every clone talks to the same connection.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Open a connection and run the configuration's pragmas on it.
    pub async fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            crate::config::DatabasePath::Memory => Connection::open_in_memory().await?,
            crate::config::DatabasePath::File(path) => Connection::open(path.clone()).await?,
        };
        trace!(path = %config.path.display(), "Opened connection");

        let connection = Self { conn };
        connection.execute_batch(&config.init_sql()).await?;
        Ok(connection)
    }

    /// Run a query with bound parameters and convert every row.
    pub async fn query_params<T>(&self, sql: &str, params: Vec<Value>) -> SqliteResult<Vec<T>>
    where
        T: FromSqliteRow + Send + 'static,
    {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing query");

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt
                    .column_names()
                    .into_iter()
                    .map(String::from)
                    .collect();

                let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
                    T::from_row(row, &columns)
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Run a statement with bound parameters; returns the affected row count.
    pub async fn execute_params(&self, sql: &str, params: Vec<Value>) -> SqliteResult<usize> {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing statement");

        self.conn
            .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?))
            .await
            .map_err(SqliteError::from)
    }

    /// Run an insert with bound parameters; returns the new rowid.
    pub async fn execute_insert_params(&self, sql: &str, params: Vec<Value>) -> SqliteResult<i64> {
        let sql = sql.to_string();
        debug!(sql = %sql, params = params.len(), "Executing insert");

        self.conn
            .call(move |conn| {
                conn.execute(&sql, rusqlite::params_from_iter(params))?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Run several statements separated by semicolons.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing batch");

        self.conn
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .map_err(SqliteError::from)
    }

    /// Check whether the connection is inside an open transaction.
    pub async fn in_transaction(&self) -> SqliteResult<bool> {
        self.conn
            .call(|conn| Ok(!conn.is_autocommit()))
            .await
            .map_err(SqliteError::from)
    }
}
