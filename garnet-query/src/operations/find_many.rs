//! FindMany operation for querying multiple records.

use tracing::{debug, instrument};

use crate::entity::Entity;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::query::SelectQuery;
use crate::relations::{Include, LoaderConfig, RelationLoader};
use crate::schema::ModelSchema;
use crate::traits::QueryEngine;
use crate::types::SortOrder;

/// A query operation that finds multiple records.
///
/// # Example
///
/// ```rust,ignore
/// let users = User::find_many(&engine)
///     .where_eq("place_id", 1)
///     .order_by("name", SortOrder::Asc)
///     .skip(0)
///     .take(10)
///     .include("things")
///     .exec()
///     .await?;
/// ```
pub struct FindManyOperation<E: QueryEngine> {
    engine: E,
    schema: &'static ModelSchema,
    query: SelectQuery,
    include: Include,
    loader: LoaderConfig,
    error: Option<QueryError>,
}

impl<E: QueryEngine> FindManyOperation<E> {
    /// Create a new FindMany operation.
    pub fn new(engine: E, schema: &'static ModelSchema) -> Self {
        Self {
            engine,
            schema,
            query: SelectQuery::new(schema.table()),
            include: Include::new(),
            loader: LoaderConfig::default(),
            error: None,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.query = self.query.r#where(filter);
        self
    }

    /// Add an equality condition.
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.r#where(Filter::equals(column, value))
    }

    /// Append an ORDER BY column.
    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.query = self.query.order_by(column, order);
        self
    }

    /// Take a limited number of records.
    pub fn take(mut self, n: u64) -> Self {
        self.query = self.query.limit(n);
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.query = self.query.offset(n);
        self
    }

    /// Apply a named scope registered on the model.
    ///
    /// An unknown scope is reported by [`exec`](Self::exec).
    pub fn scope(mut self, name: &str, args: &[FilterValue]) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.schema.apply_scope(name, self.query.clone(), args) {
            Ok(query) => self.query = query,
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Eager-load a dotted relation path on every result.
    pub fn include(mut self, path: impl AsRef<str>) -> Self {
        if let Err(e) = self.include.add_path(path.as_ref()) {
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
        self
    }

    /// Eager-load several dotted relation paths.
    pub fn include_many<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self = self.include(path);
        }
        self
    }

    /// Set the eager-loading configuration.
    pub fn with_loader_config(mut self, config: LoaderConfig) -> Self {
        self.loader = config;
        self
    }

    /// The select this operation will issue.
    pub fn query(&self) -> &SelectQuery {
        &self.query
    }

    /// Execute the query.
    ///
    /// Scope and include errors surface here, before anything is fetched.
    #[instrument(skip_all, fields(model = %self.schema.name()))]
    pub async fn exec(self) -> QueryResult<Vec<Entity>> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.include.validate(self.schema, self.loader.max_depth)?;

        let rows = self.engine.select(&self.query).await?;
        debug!(rows = rows.len(), "fetched");

        let schema = self.schema;
        let mut entities: Vec<Entity> = rows
            .into_iter()
            .map(|row| Entity::hydrate(schema, row))
            .collect();

        if !self.include.is_empty() {
            RelationLoader::new(self.engine)
                .with_config(self.loader)
                .load_include(&mut entities, &self.include)
                .await?;
        }
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::FilterValue;
    use crate::testing::{Foo, User, seeded};
    use crate::traits::Model;
    use crate::types::SortOrder;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn ids(entities: &[crate::entity::Entity]) -> Vec<Value> {
        entities.iter().filter_map(|e| e.id().cloned()).collect()
    }

    #[tokio::test]
    async fn test_find_many_all() {
        let engine = seeded();
        let users = User::find_many(&engine).exec().await.unwrap();
        assert_eq!(ids(&users), vec![json!(1), json!(2), json!(3)]);
        assert!(users.iter().all(|u| !u.is_dirty()));
    }

    #[tokio::test]
    async fn test_find_many_where_order_paginate() {
        let engine = seeded();
        let users = User::find_many(&engine)
            .where_eq("place_id", 1)
            .order_by("id", SortOrder::Desc)
            .take(1)
            .skip(1)
            .exec()
            .await
            .unwrap();
        assert_eq!(ids(&users), vec![json!(1)]);
    }

    #[tokio::test]
    async fn test_scopes() {
        let engine = seeded();
        let foos = Foo::find_many(&engine)
            .scope("last_few", &[FilterValue::Int(2)])
            .exec()
            .await
            .unwrap();
        assert_eq!(ids(&foos), vec![json!(5), json!(4)]);

        let foos = Foo::find_many(&engine)
            .scope("first_one", &[])
            .exec()
            .await
            .unwrap();
        assert_eq!(ids(&foos), vec![json!(1)]);
    }

    #[tokio::test]
    async fn test_unknown_scope_fails_on_exec() {
        let engine = seeded();
        let err = Foo::find_many(&engine)
            .scope("missing", &[])
            .scope("first_one", &[])
            .exec()
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(engine.log().is_empty());
    }

    #[tokio::test]
    async fn test_include() {
        let engine = seeded();
        let users = User::find_many(&engine)
            .include_many(["place.address", "things"])
            .include("place")
            .exec()
            .await
            .unwrap();

        assert_eq!(engine.log().len(), 4);
        let john = &users[0];
        assert_eq!(
            john.related_one("place")
                .and_then(|p| p.related_one("address"))
                .and_then(|a| a.get("street")),
            Some(&json!("Peschanaya"))
        );
        assert_eq!(john.related_many("things").len(), 2);
    }

    #[tokio::test]
    async fn test_bad_include_fails_before_select() {
        let engine = seeded();
        let err = User::find_many(&engine)
            .include("place.bogus")
            .exec()
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(engine.log().is_empty());

        let err = User::find_many(&engine)
            .include("place..address")
            .exec()
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
