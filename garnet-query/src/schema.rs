//! Static model descriptions and the process-wide schema registry.
//!
//! A [`ModelSchema`] is built once per [`Model`] type on first use, from the
//! model's associated constants plus its [`Model::relations`] and
//! [`Model::scopes`] declarations, and is read-only afterwards.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::query::SelectQuery;
use crate::relations::{Relation, RelationRegistry};
use crate::traits::Model;

static SCHEMAS: LazyLock<RwLock<HashMap<TypeId, &'static ModelSchema>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Get the schema of `M`, building and caching it on first use.
pub fn schema_of<M: Model>() -> &'static ModelSchema {
    let key = TypeId::of::<M>();
    if let Some(schema) = SCHEMAS.read().get(&key) {
        return *schema;
    }

    // Built outside the lock: declaring relations only stores function
    // pointers, but user code still runs here.
    let built = ModelSchema::build::<M>();
    let mut schemas = SCHEMAS.write();
    *schemas
        .entry(key)
        .or_insert_with(|| &*Box::leak(Box::new(built)))
}

/// Static description of a model: table, key column, columns, relations
/// and scopes.
#[derive(Debug)]
pub struct ModelSchema {
    name: &'static str,
    table: &'static str,
    primary_key: &'static str,
    columns: &'static [&'static str],
    relations: RelationRegistry,
    scopes: ScopeRegistry,
}

impl ModelSchema {
    fn build<M: Model>() -> Self {
        let mut relations = RelationRegistry::new();
        M::relations(&mut relations);
        let mut scopes = ScopeRegistry::new();
        M::scopes(&mut scopes);

        Self {
            name: M::MODEL_NAME,
            table: M::TABLE_NAME,
            primary_key: M::PRIMARY_KEY,
            columns: M::COLUMNS,
            relations,
            scopes,
        }
    }

    /// Model name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Table name.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Primary key column.
    pub fn primary_key(&self) -> &'static str {
        self.primary_key
    }

    /// Declared columns (may be empty when the model does not list them).
    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    /// Relation declarations.
    pub fn relations(&self) -> &RelationRegistry {
        &self.relations
    }

    /// Named scopes.
    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    /// Check if a relation is declared under `name`.
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains(name)
    }

    /// Resolve the relation declared under `name`.
    pub fn relation(&'static self, name: &str) -> QueryResult<Relation> {
        self.relations
            .get(name)
            .map(|decl| decl.describe(name, self))
            .ok_or_else(|| QueryError::unknown_relation(self.name, name))
    }

    /// Foreign key column other models use by default to point at this
    /// one: the lowercased model name followed by `_id`.
    pub fn default_foreign_key(&self) -> String {
        format!("{}_id", self.name.to_lowercase())
    }

    /// Apply the scope registered under `name` to `query`.
    pub fn apply_scope(
        &self,
        name: &str,
        query: SelectQuery,
        args: &[FilterValue],
    ) -> QueryResult<SelectQuery> {
        match self.scopes.get(name) {
            Some(scope) => Ok(scope(query, args)),
            None => Err(QueryError::unknown_scope(self.name, name)),
        }
    }
}

impl PartialEq for ModelSchema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for ModelSchema {}

/// A named query refinement.
///
/// ```rust
/// use garnet_query::{FilterValue, SelectQuery, SortOrder};
///
/// fn last_few(query: SelectQuery, args: &[FilterValue]) -> SelectQuery {
///     let amount = match args.first() {
///         Some(FilterValue::Int(n)) => *n as u64,
///         _ => 3,
///     };
///     query.limit(amount).order_by("id", SortOrder::Desc)
/// }
/// # let _ = last_few(SelectQuery::new("foos"), &[]);
/// ```
pub type ScopeFn = fn(SelectQuery, &[FilterValue]) -> SelectQuery;

/// Registry of named scopes for a model.
#[derive(Clone, Default)]
pub struct ScopeRegistry {
    scopes: IndexMap<String, ScopeFn>,
}

impl ScopeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scope, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, scope: ScopeFn) -> &mut Self {
        self.scopes.insert(name.into(), scope);
        self
    }

    /// Get a scope by name.
    pub fn get(&self, name: &str) -> Option<ScopeFn> {
        self.scopes.get(name).copied()
    }

    /// Check if a scope is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// Registered scope names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.scopes.keys()).finish()
    }
}
