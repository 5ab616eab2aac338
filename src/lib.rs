//! # Garnet
//!
//! An async ORM whose models declare their relations once and load them
//! eagerly, to any depth, with one query per relation per level.
//!
//! Garnet provides:
//! - Marker-type models with `belongs_to`, `has_many` and `belongs_to_many`
//!   relations
//! - Dot-path includes (`"place.address"`) resolved in batches
//! - Finders, named scopes and entity persistence over a pluggable
//!   [`QueryEngine`]
//! - A SQLite engine with transactions (feature `sqlite`, on by default)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use garnet_orm::prelude::*;
//!
//! struct Place;
//! struct User;
//!
//! impl Model for Place {
//!     const MODEL_NAME: &'static str = "Place";
//!     const TABLE_NAME: &'static str = "places";
//!
//!     fn relations(relations: &mut RelationRegistry) {
//!         relations.has_many::<User>("users");
//!     }
//! }
//!
//! impl Model for User {
//!     const MODEL_NAME: &'static str = "User";
//!     const TABLE_NAME: &'static str = "users";
//!
//!     fn relations(relations: &mut RelationRegistry) {
//!         relations.belongs_to::<Place>("place");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = SqliteEngine::open(SqliteConfig::from_env()?).await?;
//!
//!     let places = Place::find_many(&engine)
//!         .include("users.place")
//!         .exec()
//!         .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&places)?);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use garnet_query::*;

/// SQLite query engine.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use garnet_sqlite::*;
}

#[cfg(feature = "sqlite")]
pub use garnet_sqlite::{SqliteConfig, SqliteEngine, SqliteTransaction};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use garnet_query::prelude::*;

    #[cfg(feature = "sqlite")]
    pub use garnet_sqlite::{SqliteConfig, SqliteEngine};
}
