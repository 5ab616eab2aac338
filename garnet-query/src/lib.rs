//! # garnet-query
//!
//! Models, entities and batched eager loading for the Garnet ORM.
//!
//! This crate provides:
//! - Model declarations with named relations and scopes ([`Model`])
//! - Entities with change tracking and lifecycle operations ([`Entity`])
//! - Fluent query operations (`find_many`, `find_first`, `find`)
//! - Eager loading of dotted relation paths without N+1 queries ([`RelationLoader`])
//! - Serialization of entity trees to JSON documents
//!
//! Execution is delegated to a [`QueryEngine`]; `garnet-sqlite` provides one
//! for SQLite.
//!
//! ## Declaring models
//!
//! ```rust
//! use garnet_query::prelude::*;
//!
//! struct Place;
//! struct Thing;
//! struct User;
//!
//! impl Model for Place {
//!     const MODEL_NAME: &'static str = "Place";
//!     const TABLE_NAME: &'static str = "places";
//! }
//!
//! impl Model for Thing {
//!     const MODEL_NAME: &'static str = "Thing";
//!     const TABLE_NAME: &'static str = "things";
//! }
//!
//! impl Model for User {
//!     const MODEL_NAME: &'static str = "User";
//!     const TABLE_NAME: &'static str = "users";
//!
//!     fn relations(relations: &mut RelationRegistry) {
//!         relations.belongs_to::<Place>("place");
//!         relations.has_many::<Thing>("things");
//!     }
//! }
//!
//! let user = User::create([("name", "John Doe")]);
//! assert!(user.is_new());
//! assert_eq!(User::schema().relation("things").unwrap().remote_key(), "user_id");
//! ```
//!
//! ## Eager loading
//!
//! ```rust,ignore
//! let users = User::find_many(&engine)
//!     .include_many(["place.address", "things"])
//!     .exec()
//!     .await?;
//!
//! let document = users[0].to_json();
//! ```
//!
//! ## Filters
//!
//! ```rust
//! use garnet_query::{Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::equals("place_id", 1),
//!     Filter::IsNotNull("name".into()),
//! ]);
//! let (sql, params) = filter.to_sql(0);
//! assert_eq!(sql, "(\"place_id\" = ?1 AND \"name\" IS NOT NULL)");
//! assert_eq!(params, vec![FilterValue::Int(1)]);
//! ```

pub mod entity;
pub mod error;
pub mod filter;
pub mod logging;
pub mod operations;
pub mod persist;
pub mod query;
pub mod relations;
pub mod schema;
pub mod serialize;
pub mod traits;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod testing;

pub use entity::{Entity, Related};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult};
pub use filter::{Filter, FilterValue};
pub use operations::{FindFirstOperation, FindManyOperation, FindUniqueOperation};
pub use query::SelectQuery;
pub use relations::{
    Include, IncludeSpec, JoinTableSpec, LoaderConfig, Relation, RelationDecl, RelationKind,
    RelationLoader, RelationRegistry, include,
};
pub use schema::{ModelSchema, ScopeFn, ScopeRegistry, schema_of};
pub use traits::{BoxFuture, Model, QueryEngine};
pub use transaction::{TransactionHandle, TransactionMode, Transactional};
pub use types::{OrderByField, Row, SortOrder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::entity::{Entity, Related};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::operations::*;
    pub use crate::relations::{Include, LoaderConfig, RelationLoader, RelationRegistry, include};
    pub use crate::schema::ScopeRegistry;
    pub use crate::traits::{Model, QueryEngine};
    pub use crate::transaction::{TransactionHandle, Transactional};
    pub use crate::types::{Row, SortOrder};
}
