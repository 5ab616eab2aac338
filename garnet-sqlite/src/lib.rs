//! SQLite query engine for the Garnet ORM.
//!
//! [`SqliteEngine`] implements [`garnet_query::QueryEngine`] on top of
//! `tokio-rusqlite`, so every operation in `garnet-query` (finders, eager
//! loading, persistence) runs against an in-memory or file database.
//!
//! # Example
//!
//! ```rust,ignore
//! use garnet_sqlite::{SqliteConfig, SqliteEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SqliteConfig::from_url("sqlite://./app.db?foreign_keys=true")?;
//!     let engine = SqliteEngine::open(config).await?;
//!
//!     let users = User::find_many(&engine).include("place.address").exec().await?;
//!     println!("{} queries", engine.stats().selects);
//!     Ok(())
//! }
//! ```
//!
//! # Transactions
//!
//! ```rust,ignore
//! use garnet_query::{TransactionHandle, Transactional};
//!
//! let tx = engine.begin().await?;
//! user.update(&tx).await?;
//! tx.commit().await?;
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod row;
pub mod stats;
pub mod transaction;
pub mod types;

pub use config::{DATABASE_URL_ENV, DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use connection::SqliteConnection;
pub use engine::SqliteEngine;
pub use error::{SqliteError, SqliteResult};
pub use row::FromSqliteRow;
pub use stats::{QueryStats, StatementKind, StatsSnapshot};
pub use transaction::SqliteTransaction;
