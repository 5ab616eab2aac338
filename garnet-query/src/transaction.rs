//! Transaction support.
//!
//! A transaction is just another [`QueryEngine`]: begin one on an engine that
//! implements [`Transactional`], pass the handle (by reference) to any
//! operation, eager load included, then commit or roll it back.
//!
//! ```rust,ignore
//! let tx = engine.begin().await?;
//! let mut user = User::create([("name", json!("Jane"))]);
//! user.insert(&tx).await?;
//! user.load(&tx, ["place"]).await?;
//! tx.commit().await?;
//! ```
//!
//! # Begin modes
//!
//! ```rust
//! use garnet_query::TransactionMode;
//!
//! assert_eq!(TransactionMode::default(), TransactionMode::Deferred);
//! assert_eq!(TransactionMode::Immediate.begin_sql(), "BEGIN IMMEDIATE");
//! ```

use crate::error::QueryResult;
use crate::traits::{BoxFuture, QueryEngine};

/// How a transaction acquires its locks when it begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionMode {
    /// Locks are taken on first use.
    #[default]
    Deferred,
    /// A write lock is taken immediately.
    Immediate,
    /// An exclusive lock is taken immediately.
    Exclusive,
}

impl TransactionMode {
    /// Get the statement that opens a transaction in this mode.
    pub fn begin_sql(&self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED",
            Self::Immediate => "BEGIN IMMEDIATE",
            Self::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// An engine that can open transactions.
pub trait Transactional: QueryEngine {
    /// The handle type returned by [`begin`](Self::begin).
    type Transaction: TransactionHandle;

    /// Open a transaction in the default mode.
    fn begin(&self) -> BoxFuture<'_, QueryResult<Self::Transaction>> {
        self.begin_with(TransactionMode::default())
    }

    /// Open a transaction in the given mode.
    fn begin_with(&self, mode: TransactionMode) -> BoxFuture<'_, QueryResult<Self::Transaction>>;
}

/// An open transaction.
///
/// Dropping a handle without committing rolls the transaction back. Operations
/// accept any [`QueryEngine`] by value, so hand them `&tx`: passing the
/// handle itself moves it into the operation, which drops it on return.
pub trait TransactionHandle: QueryEngine + Sized {
    /// Commit the transaction.
    fn commit(self) -> BoxFuture<'static, QueryResult<()>>;

    /// Roll the transaction back.
    fn rollback(self) -> BoxFuture<'static, QueryResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_sql() {
        assert_eq!(TransactionMode::Deferred.begin_sql(), "BEGIN DEFERRED");
        assert_eq!(TransactionMode::Exclusive.begin_sql(), "BEGIN EXCLUSIVE");
    }
}
