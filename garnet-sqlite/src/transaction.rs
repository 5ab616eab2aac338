//! Transactions on a [`SqliteEngine`](crate::SqliteEngine).

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, warn};

use garnet_query::error::{QueryError, QueryResult};
use garnet_query::filter::Filter;
use garnet_query::traits::{BoxFuture, QueryEngine};
use garnet_query::transaction::{TransactionHandle, TransactionMode};
use garnet_query::{Row, SelectQuery};

use crate::engine::EngineInner;

/// An open SQLite transaction.
///
/// The transaction owns the engine's connection until it is committed,
/// rolled back or dropped; statements issued through the engine meanwhile
/// wait. Dropping an unfinished transaction rolls it back.
///
/// Pass the handle to operations by reference (`thing.insert(&tx)`). An
/// operation given the handle by value drops it when it returns, which rolls
/// the transaction back.
///
/// A `COMMIT` or `ROLLBACK` that fails is reported as a transaction error
/// ([`QueryError::is_transaction_error`]), with the driver error as source.
pub struct SqliteTransaction {
    inner: Arc<EngineInner>,
    permit: Option<OwnedSemaphorePermit>,
    mode: TransactionMode,
}

impl SqliteTransaction {
    pub(crate) async fn begin(inner: Arc<EngineInner>, mode: TransactionMode) -> QueryResult<Self> {
        let permit = inner
            .gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| QueryError::connection("SQLite engine is closed"))?;

        inner.conn.execute_batch(mode.begin_sql()).await?;
        debug!(?mode, "Transaction started");

        Ok(Self {
            inner,
            permit: Some(permit),
            mode,
        })
    }

    /// The mode the transaction was opened in.
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    fn finish(&mut self, sql: &'static str) -> BoxFuture<'static, QueryResult<()>> {
        let permit = self.permit.take();
        let inner = self.inner.clone();

        Box::pin(async move {
            let Some(permit) = permit else {
                return Err(QueryError::transaction_closed());
            };

            let result = inner.conn.execute_batch(sql).await;
            if let Err(e) = &result {
                warn!(error = %e, statement = sql, "Failed to finish transaction");
                if inner.conn.in_transaction().await.unwrap_or(false) {
                    if let Err(e) = inner.conn.execute_batch("ROLLBACK").await {
                        warn!(error = %e, "Rollback after failure also failed");
                    }
                }
            } else {
                debug!(statement = sql, "Transaction finished");
            }

            drop(permit);
            result.map_err(|e| {
                QueryError::transaction(format!("{} failed: {}", sql, e))
                    .with_context("finish transaction")
                    .with_source(e)
            })
        })
    }
}

impl QueryEngine for SqliteTransaction {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        Box::pin(self.inner.select(query))
    }

    fn insert<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        key_column: &'a str,
    ) -> BoxFuture<'a, QueryResult<JsonValue>> {
        Box::pin(self.inner.insert(table, values, key_column))
    }

    fn update<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        filter: &'a Filter,
    ) -> BoxFuture<'a, QueryResult<u64>> {
        Box::pin(self.inner.update(table, values, filter))
    }

    fn delete<'a>(&'a self, table: &'a str, filter: &'a Filter) -> BoxFuture<'a, QueryResult<u64>> {
        Box::pin(self.inner.delete(table, filter))
    }
}

impl TransactionHandle for SqliteTransaction {
    fn commit(mut self) -> BoxFuture<'static, QueryResult<()>> {
        self.finish("COMMIT")
    }

    fn rollback(mut self) -> BoxFuture<'static, QueryResult<()>> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        warn!("Transaction dropped without commit, rolling back");

        let inner = self.inner.clone();
        let rollback = async move {
            if let Err(e) = inner.conn.execute_batch("ROLLBACK").await {
                warn!(error = %e, "Rollback of dropped transaction failed");
            }
            drop(permit);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(rollback);
            }
            Err(_) => futures::executor::block_on(rollback),
        }
    }
}
