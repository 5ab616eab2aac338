//! Relation declarations and eager loading.
//!
//! Models declare named relations in [`Model::relations`](crate::Model::relations).
//! Each declaration resolves to a [`Relation`] descriptor that knows which
//! columns link owner and target rows. The [`RelationLoader`] walks an
//! [`Include`] tree and fetches every relation of a level in one batch for
//! all parents.
//!
//! ```rust,ignore
//! // one query for users, then one for places, one for addresses and one
//! // for things, whatever the number of users
//! let users = User::find_many(&engine)
//!     .include_many(["place.address", "things"])
//!     .exec()
//!     .await?;
//! ```

mod include;
mod loader;
mod spec;

pub use include::{Include, IncludeSpec, include};
pub use loader::{DEFAULT_MAX_DEPTH, LoaderConfig, RelationLoader};
pub use spec::{JoinTableSpec, Relation, RelationDecl, RelationKind, RelationRegistry, SchemaRef};
