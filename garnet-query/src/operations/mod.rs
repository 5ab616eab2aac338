//! Query operations for the fluent API.
//!
//! - `FindManyOperation` - Find multiple records
//! - `FindFirstOperation` - Find the first matching record
//! - `FindUniqueOperation` - Find one record by primary key
//!
//! Each operation issues one select for its own model, then hands the
//! hydrated entities to the [`RelationLoader`](crate::relations::RelationLoader)
//! when includes were requested.

mod find_first;
mod find_many;
mod find_unique;

pub use find_first::FindFirstOperation;
pub use find_many::FindManyOperation;
pub use find_unique::FindUniqueOperation;
