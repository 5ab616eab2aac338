//! FindFirst operation for finding the first matching record.

use crate::entity::Entity;
use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue};
use crate::relations::LoaderConfig;
use crate::schema::ModelSchema;
use crate::traits::QueryEngine;
use crate::types::SortOrder;

use super::FindManyOperation;

/// A query operation that finds the first record matching a filter.
///
/// ```rust,ignore
/// let newest = Foo::find_first(&engine)
///     .order_by("id", SortOrder::Desc)
///     .exec()
///     .await?;
/// ```
pub struct FindFirstOperation<E: QueryEngine> {
    inner: FindManyOperation<E>,
}

impl<E: QueryEngine> FindFirstOperation<E> {
    /// Create a new FindFirst operation.
    pub fn new(engine: E, schema: &'static ModelSchema) -> Self {
        Self {
            inner: FindManyOperation::new(engine, schema),
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.inner = self.inner.r#where(filter);
        self
    }

    /// Add an equality condition.
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.inner = self.inner.where_eq(column, value);
        self
    }

    /// Append an ORDER BY column.
    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.inner = self.inner.order_by(column, order);
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.inner = self.inner.skip(n);
        self
    }

    /// Apply a named scope registered on the model.
    pub fn scope(mut self, name: &str, args: &[FilterValue]) -> Self {
        self.inner = self.inner.scope(name, args);
        self
    }

    /// Eager-load a dotted relation path.
    pub fn include(mut self, path: impl AsRef<str>) -> Self {
        self.inner = self.inner.include(path);
        self
    }

    /// Eager-load several dotted relation paths.
    pub fn include_many<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner = self.inner.include_many(paths);
        self
    }

    /// Set the eager-loading configuration.
    pub fn with_loader_config(mut self, config: LoaderConfig) -> Self {
        self.inner = self.inner.with_loader_config(config);
        self
    }

    /// Execute the query.
    pub async fn exec(self) -> QueryResult<Option<Entity>> {
        let found = self.inner.take(1).exec().await?;
        Ok(found.into_iter().next())
    }
}
