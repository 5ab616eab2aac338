//! Relation declarations and the descriptors resolved from them.

use indexmap::IndexMap;
use indexmap::map::Entry;
use std::fmt;

use crate::filter::{Filter, FilterValue};
use crate::query::SelectQuery;
use crate::schema::ModelSchema;
use crate::traits::Model;

/// Lazily resolves the schema of a relation target.
///
/// Declarations hold a function pointer instead of the schema itself so that
/// models referring to each other never recurse while being registered.
pub type SchemaRef = fn() -> &'static ModelSchema;

/// Kind of relation between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The owner holds a foreign key to one target row (e.g. User belongs to Place).
    BelongsTo,
    /// Target rows hold a foreign key back to the owner (e.g. User has many Things).
    HasMany,
    /// A join table correlates owner and target keys (e.g. User has many Tags).
    BelongsToMany,
}

impl RelationKind {
    /// Check if this relation attaches a sequence of records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::HasMany | Self::BelongsToMany)
    }

    /// Check if this relation attaches at most one record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::BelongsTo)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BelongsTo => "belongs_to",
            Self::HasMany => "has_many",
            Self::BelongsToMany => "belongs_to_many",
        })
    }
}

/// A relation as declared in [`Model::relations`].
///
/// Every column is optional; unset columns fall back to the naming
/// convention when the declaration is resolved with [`RelationDecl::describe`].
#[derive(Debug, Clone)]
pub struct RelationDecl {
    kind: RelationKind,
    target: SchemaRef,
    foreign_key: Option<String>,
    references: Option<String>,
    join_table: Option<String>,
    related_key: Option<String>,
    related_references: Option<String>,
}

impl RelationDecl {
    fn new(kind: RelationKind, target: SchemaRef) -> Self {
        Self {
            kind,
            target,
            foreign_key: None,
            references: None,
            join_table: None,
            related_key: None,
            related_references: None,
        }
    }

    /// The kind of relation.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// The target model's schema.
    pub fn target(&self) -> &'static ModelSchema {
        (self.target)()
    }

    /// Override the foreign key column.
    ///
    /// For `belongs_to` this is the column on the owner, for `has_many` the
    /// column on the target, for `belongs_to_many` the join table column
    /// pointing at the owner.
    pub fn foreign_key(&mut self, column: impl Into<String>) -> &mut Self {
        self.foreign_key = Some(column.into());
        self
    }

    /// Override the column the foreign key references.
    ///
    /// For `belongs_to` this is a target column, for `has_many` and
    /// `belongs_to_many` an owner column.
    pub fn references(&mut self, column: impl Into<String>) -> &mut Self {
        self.references = Some(column.into());
        self
    }

    /// Override the join table (`belongs_to_many` only).
    pub fn join_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.join_table = Some(table.into());
        self
    }

    /// Override the join table column pointing at the target
    /// (`belongs_to_many` only).
    pub fn related_key(&mut self, column: impl Into<String>) -> &mut Self {
        self.related_key = Some(column.into());
        self
    }

    /// Override the target column referenced by the join table
    /// (`belongs_to_many` only).
    pub fn related_references(&mut self, column: impl Into<String>) -> &mut Self {
        self.related_references = Some(column.into());
        self
    }

    /// Resolve this declaration into an immutable descriptor.
    pub fn describe(&self, name: &str, owner: &'static ModelSchema) -> Relation {
        let target = self.target();
        let pick = |value: &Option<String>, default: String| value.clone().unwrap_or(default);

        let (local_key, remote_key, join) = match self.kind {
            RelationKind::BelongsTo => (
                pick(&self.foreign_key, target.default_foreign_key()),
                pick(&self.references, target.primary_key().to_string()),
                None,
            ),
            RelationKind::HasMany => (
                pick(&self.references, owner.primary_key().to_string()),
                pick(&self.foreign_key, owner.default_foreign_key()),
                None,
            ),
            RelationKind::BelongsToMany => {
                let mut tables = [owner.table(), target.table()];
                tables.sort_unstable();
                let join = JoinTableSpec::new(
                    pick(&self.join_table, tables.join("_")),
                    pick(&self.foreign_key, owner.default_foreign_key()),
                    pick(&self.related_key, target.default_foreign_key()),
                );
                (
                    pick(&self.references, owner.primary_key().to_string()),
                    pick(&self.related_references, target.primary_key().to_string()),
                    Some(join),
                )
            }
        };

        Relation {
            name: name.to_string(),
            kind: self.kind,
            owner,
            target,
            local_key,
            remote_key,
            join,
        }
    }
}

/// Specification for a join table (many-to-many).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTableSpec {
    /// Name of the join table.
    pub table_name: String,
    /// Column referencing the owner model.
    pub source_column: String,
    /// Column referencing the target model.
    pub target_column: String,
}

impl JoinTableSpec {
    /// Create a new join table spec.
    pub fn new(
        table_name: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }

    /// Query fetching the join rows for the given owner keys.
    pub fn query(&self, keys: Vec<FilterValue>) -> SelectQuery {
        SelectQuery::new(&self.table_name).r#where(Filter::column_in(&self.source_column, keys))
    }
}

/// A resolved relation descriptor. Immutable once built.
///
/// Whatever the kind, a parent is linked through the value of its
/// [`local_key`](Self::local_key) column, and target rows are matched on
/// their [`remote_key`](Self::remote_key) column (directly, or through the
/// join table for many-to-many).
#[derive(Clone)]
pub struct Relation {
    name: String,
    kind: RelationKind,
    owner: &'static ModelSchema,
    target: &'static ModelSchema,
    local_key: String,
    remote_key: String,
    join: Option<JoinTableSpec>,
}

impl Relation {
    /// Relation name on the owner.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relation kind.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Schema of the model declaring the relation.
    pub fn owner(&self) -> &'static ModelSchema {
        self.owner
    }

    /// Schema of the related model.
    pub fn target(&self) -> &'static ModelSchema {
        self.target
    }

    /// Owner column whose value links a parent to its related rows.
    pub fn local_key(&self) -> &str {
        &self.local_key
    }

    /// Target column matched against the linking values.
    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }

    /// Join table, for many-to-many relations.
    pub fn join_table(&self) -> Option<&JoinTableSpec> {
        self.join.as_ref()
    }

    /// Query fetching the target rows whose remote key is one of `keys`.
    pub fn target_query(&self, keys: Vec<FilterValue>) -> SelectQuery {
        SelectQuery::new(self.target.table()).r#where(Filter::column_in(&self.remote_key, keys))
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("owner", &self.owner.name())
            .field("target", &self.target.name())
            .field("local_key", &self.local_key)
            .field("remote_key", &self.remote_key)
            .field("join", &self.join)
            .finish()
    }
}

/// Registry of relation declarations for a model, keyed by relation name in
/// declaration order.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    relations: IndexMap<String, RelationDecl>,
}

impl RelationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a to-one relation whose foreign key lives on the owner.
    pub fn belongs_to<T: Model>(&mut self, name: impl Into<String>) -> &mut RelationDecl {
        self.declare(name.into(), RelationKind::BelongsTo, T::schema)
    }

    /// Declare a to-many relation whose foreign key lives on the target.
    pub fn has_many<T: Model>(&mut self, name: impl Into<String>) -> &mut RelationDecl {
        self.declare(name.into(), RelationKind::HasMany, T::schema)
    }

    /// Declare a many-to-many relation through a join table.
    pub fn belongs_to_many<T: Model>(&mut self, name: impl Into<String>) -> &mut RelationDecl {
        self.declare(name.into(), RelationKind::BelongsToMany, T::schema)
    }

    fn declare(&mut self, name: String, kind: RelationKind, target: SchemaRef) -> &mut RelationDecl {
        let decl = RelationDecl::new(kind, target);
        match self.relations.entry(name) {
            Entry::Occupied(mut entry) => {
                entry.insert(decl);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(decl),
        }
    }

    /// Get a declaration by name.
    pub fn get(&self, name: &str) -> Option<&RelationDecl> {
        self.relations.get(name)
    }

    /// Check if a relation is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Declared relation names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Get the number of declared relations.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Check if no relation is declared.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Address, Place, Tag, Thing, User};

    #[test]
    fn test_relation_kind() {
        assert!(RelationKind::HasMany.is_many());
        assert!(RelationKind::BelongsToMany.is_many());
        assert!(!RelationKind::BelongsTo.is_many());
        assert!(RelationKind::BelongsTo.is_one());
        assert_eq!(RelationKind::BelongsToMany.to_string(), "belongs_to_many");
    }

    #[test]
    fn test_belongs_to_defaults() {
        let relation = User::schema().relation("place").unwrap();
        assert_eq!(relation.kind(), RelationKind::BelongsTo);
        assert_eq!(relation.target().name(), "Place");
        assert_eq!(relation.local_key(), "place_id");
        assert_eq!(relation.remote_key(), "id");
        assert!(relation.join_table().is_none());
    }

    #[test]
    fn test_has_many_defaults() {
        let relation = User::schema().relation("things").unwrap();
        assert_eq!(relation.kind(), RelationKind::HasMany);
        assert_eq!(relation.local_key(), "id");
        assert_eq!(relation.remote_key(), "user_id");
    }

    #[test]
    fn test_belongs_to_many_defaults() {
        let relation = User::schema().relation("tags").unwrap();
        assert_eq!(relation.local_key(), "id");
        assert_eq!(relation.remote_key(), "id");
        assert_eq!(
            relation.join_table(),
            Some(&JoinTableSpec::new("tags_users", "user_id", "tag_id"))
        );
    }

    #[test]
    fn test_overrides() {
        let mut registry = RelationRegistry::new();
        registry.belongs_to::<User>("author").foreign_key("author_id");
        registry
            .belongs_to_many::<Tag>("labels")
            .join_table("user_labels")
            .foreign_key("owner_id")
            .related_key("label_id");

        let author = registry.get("author").unwrap().describe("author", Thing::schema());
        assert_eq!(author.target().name(), "User");
        assert_eq!(author.local_key(), "author_id");
        assert_eq!(author.remote_key(), "id");

        let labels = registry.get("labels").unwrap().describe("labels", User::schema());
        assert_eq!(
            labels.join_table(),
            Some(&JoinTableSpec::new("user_labels", "owner_id", "label_id"))
        );
    }

    #[test]
    fn test_has_many_declared_on_address() {
        let relation = Address::schema().relation("places").unwrap();
        assert_eq!(relation.target().name(), "Place");
        assert_eq!(relation.remote_key(), "address_id");
    }

    #[test]
    fn test_queries() {
        let relation = Place::schema().relation("users").unwrap();
        let query = relation.target_query(vec![1.into(), 2.into()]);
        assert_eq!(query.table, "users");
        assert_eq!(
            query.filter,
            Filter::In("place_id".into(), vec![1.into(), 2.into()])
        );
        assert!(relation.join_table().is_none());

        let relation = Tag::schema().relation("users").unwrap();
        let query = relation.join_table().unwrap().query(vec![3.into()]);
        assert_eq!(query.table, "tags_users");
        assert_eq!(query.filter, Filter::equals("tag_id", 3));
    }

    #[test]
    fn test_registry_redeclare_replaces() {
        let mut registry = RelationRegistry::new();
        registry.has_many::<Thing>("things").foreign_key("owner_id");
        registry.has_many::<Thing>("things");
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("things"));
        assert!(!registry.contains("nonexistent"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["things"]);
    }
}
