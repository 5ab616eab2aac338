//! FindUnique operation for finding a single record by primary key.

use crate::entity::Entity;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::relations::LoaderConfig;
use crate::schema::ModelSchema;
use crate::traits::QueryEngine;

use super::FindManyOperation;

/// A query operation that finds a single record by its primary key.
///
/// ```rust,ignore
/// let user = User::find(&engine, 1).include("place").exec().await?;
/// ```
pub struct FindUniqueOperation<E: QueryEngine> {
    inner: FindManyOperation<E>,
    model: &'static str,
}

impl<E: QueryEngine> FindUniqueOperation<E> {
    /// Create a new FindUnique operation.
    pub fn new(engine: E, schema: &'static ModelSchema, id: impl Into<FilterValue>) -> Self {
        let filter = Filter::equals(schema.primary_key(), id);
        Self {
            inner: FindManyOperation::new(engine, schema).r#where(filter).take(1),
            model: schema.name(),
        }
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

    /// Execute the query, failing with a not-found error when no row matches.
    pub async fn exec(self) -> QueryResult<Entity> {
        let model = self.model;
        self.exec_optional()
            .await?
            .ok_or_else(|| QueryError::not_found(model))
    }

    /// Execute the query, returning `None` when no row matches.
    pub async fn exec_optional(self) -> QueryResult<Option<Entity>> {
        let found = self.inner.exec().await?;
        Ok(found.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::Filter;
    use crate::testing::{Place, User, seeded};
    use crate::traits::Model;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_find_by_key() {
        let engine = seeded();
        let place = Place::find(&engine, 2).exec().await.unwrap();
        assert_eq!(place.get("name"), Some(&json!("Work")));

        let query = engine.last_select("places");
        assert_eq!(query.filter, Filter::equals("id", 2));
        assert_eq!(query.limit, Some(1));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let engine = seeded();
        let err = User::find(&engine, 42).exec().await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.message.contains("User"));
        assert!(User::find(&engine, 42).exec_optional().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_with_include() {
        let engine = seeded();
        let place = Place::find(&engine, 1)
            .include_many(["users.things", "address"])
            .exec()
            .await
            .unwrap();

        assert_eq!(
            place.to_json(),
            json!({
                "id": 1,
                "name": "Home",
                "address_id": 1,
                "users": [
                    {
                        "id": 1, "name": "John Doe", "place_id": 1,
                        "things": [
                            { "id": 1, "name": "Book", "user_id": 1 },
                            { "id": 2, "name": "Pen", "user_id": 1 }
                        ]
                    },
                    {
                        "id": 2, "name": "Bob Marley", "place_id": 1,
                        "things": [
                            { "id": 3, "name": "Phone", "user_id": 2 }
                        ]
                    }
                ],
                "address": { "id": 1, "street": "Peschanaya" }
            })
        );
    }
}
