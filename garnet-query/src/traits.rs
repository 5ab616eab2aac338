//! Core traits: the execution engine seam and model declarations.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue};
use crate::operations::{FindFirstOperation, FindManyOperation, FindUniqueOperation};
use crate::query::SelectQuery;
use crate::relations::RelationRegistry;
use crate::schema::{ModelSchema, ScopeRegistry, schema_of};
use crate::types::Row;

/// A boxed future, as returned by [`QueryEngine`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The query-execution collaborator.
///
/// The model layer never renders SQL for writes or talks to a driver; it
/// hands one of these four requests to an engine and works with the rows
/// that come back. Transactions are threaded through by passing a
/// transaction handle that itself implements this trait.
pub trait QueryEngine: Send + Sync {
    /// Run a single-table select.
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>>;

    /// Insert `values` into `table` and return the row's key.
    ///
    /// When `values` does not carry `key_column`, the engine returns the
    /// key it generated.
    fn insert<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        key_column: &'a str,
    ) -> BoxFuture<'a, QueryResult<Value>>;

    /// Update the rows matching `filter` and return how many changed.
    fn update<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        filter: &'a Filter,
    ) -> BoxFuture<'a, QueryResult<u64>>;

    /// Delete the rows matching `filter` and return how many were removed.
    fn delete<'a>(&'a self, table: &'a str, filter: &'a Filter) -> BoxFuture<'a, QueryResult<u64>>;
}

impl<E: QueryEngine + ?Sized> QueryEngine for &E {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        (**self).select(query)
    }

    fn insert<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        key_column: &'a str,
    ) -> BoxFuture<'a, QueryResult<Value>> {
        (**self).insert(table, values, key_column)
    }

    fn update<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        filter: &'a Filter,
    ) -> BoxFuture<'a, QueryResult<u64>> {
        (**self).update(table, values, filter)
    }

    fn delete<'a>(&'a self, table: &'a str, filter: &'a Filter) -> BoxFuture<'a, QueryResult<u64>> {
        (**self).delete(table, filter)
    }
}

impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, QueryResult<Vec<Row>>> {
        (**self).select(query)
    }

    fn insert<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        key_column: &'a str,
    ) -> BoxFuture<'a, QueryResult<Value>> {
        (**self).insert(table, values, key_column)
    }

    fn update<'a>(
        &'a self,
        table: &'a str,
        values: &'a Row,
        filter: &'a Filter,
    ) -> BoxFuture<'a, QueryResult<u64>> {
        (**self).update(table, values, filter)
    }

    fn delete<'a>(&'a self, table: &'a str, filter: &'a Filter) -> BoxFuture<'a, QueryResult<u64>> {
        (**self).delete(table, filter)
    }
}

/// A model declaration.
///
/// Models are plain marker types; records are [`Entity`] values carrying a
/// reference to the model's [`ModelSchema`].
///
/// ```rust
/// use garnet_query::{Model, RelationRegistry};
///
/// struct Place;
/// struct User;
///
/// impl Model for Place {
///     const MODEL_NAME: &'static str = "Place";
///     const TABLE_NAME: &'static str = "places";
///
///     fn relations(relations: &mut RelationRegistry) {
///         relations.has_many::<User>("users");
///     }
/// }
///
/// impl Model for User {
///     const MODEL_NAME: &'static str = "User";
///     const TABLE_NAME: &'static str = "users";
///
///     fn relations(relations: &mut RelationRegistry) {
///         relations.belongs_to::<Place>("place");
///     }
/// }
///
/// let place = User::schema().relation("place").unwrap();
/// assert_eq!(place.local_key(), "place_id");
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// The model name, used for default foreign keys and error messages.
    const MODEL_NAME: &'static str;

    /// The database table name.
    const TABLE_NAME: &'static str;

    /// The primary key column.
    const PRIMARY_KEY: &'static str = "id";

    /// All column names, when known.
    const COLUMNS: &'static [&'static str] = &[];

    /// Declare the model's relations.
    fn relations(_relations: &mut RelationRegistry) {}

    /// Declare the model's named scopes.
    fn scopes(_scopes: &mut ScopeRegistry) {}

    /// The model's schema.
    fn schema() -> &'static ModelSchema {
        schema_of::<Self>()
    }

    /// Build a new, unsaved entity.
    fn create<K, V>(attributes: impl IntoIterator<Item = (K, V)>) -> Entity
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Entity::new(Self::schema(), attributes)
    }

    /// Start a query for many records.
    fn find_many<E: QueryEngine>(engine: E) -> FindManyOperation<E> {
        FindManyOperation::new(engine, Self::schema())
    }

    /// Start a query for the first matching record.
    fn find_first<E: QueryEngine>(engine: E) -> FindFirstOperation<E> {
        FindFirstOperation::new(engine, Self::schema())
    }

    /// Start a lookup by primary key.
    fn find<E: QueryEngine>(engine: E, id: impl Into<FilterValue>) -> FindUniqueOperation<E> {
        FindUniqueOperation::new(engine, Self::schema(), id)
    }
}
