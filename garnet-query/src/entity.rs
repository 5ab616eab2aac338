//! Entities: records with tracked attributes and attached relations.
//!
//! An [`Entity`] keeps two attribute maps: the current attributes and a
//! snapshot of the attributes as last read from or written to the database.
//! [`Entity::changed_attributes`] is the difference between the two, which is
//! what `update` persists.
//!
//! Related data is attached by the eager loader only. Attachments are owned
//! copies, so an entity graph is always a tree.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

use crate::error::{QueryError, QueryResult};
use crate::schema::ModelSchema;
use crate::types::Row;

/// Related data attached to an entity under a relation name.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// To-one relation: the related entity, or `None` when nothing matched.
    One(Option<Box<Entity>>),
    /// To-many relation: matches in the order the engine returned them.
    Many(Vec<Entity>),
}

impl Related {
    /// The single related entity, if this is a to-one attachment with a match.
    pub fn as_one(&self) -> Option<&Entity> {
        match self {
            Self::One(entity) => entity.as_deref(),
            Self::Many(_) => None,
        }
    }

    /// The related entities, if this is a to-many attachment.
    pub fn as_many(&self) -> Option<&[Entity]> {
        match self {
            Self::One(_) => None,
            Self::Many(entities) => Some(entities),
        }
    }
}

/// A record of some model.
#[derive(Clone)]
pub struct Entity {
    schema: &'static ModelSchema,
    attributes: Row,
    previous: Row,
    related: IndexMap<String, Related>,
}

impl Entity {
    /// Build a new, unsaved entity with an empty snapshot.
    pub fn new<K, V>(schema: &'static ModelSchema, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            schema,
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            previous: Row::new(),
            related: IndexMap::new(),
        }
    }

    /// Build an entity from a fetched row; the snapshot equals the row.
    pub fn hydrate(schema: &'static ModelSchema, row: Row) -> Self {
        Self {
            schema,
            previous: row.clone(),
            attributes: row,
            related: IndexMap::new(),
        }
    }

    /// The entity's model schema.
    pub fn schema(&self) -> &'static ModelSchema {
        self.schema
    }

    /// The primary key value, if set and not null.
    pub fn id(&self) -> Option<&Value> {
        self.attributes
            .get(self.schema.primary_key())
            .filter(|value| !value.is_null())
    }

    /// Check if the entity has no key yet.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Get an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Get an attribute deserialized into `T`.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> QueryResult<Option<T>> {
        self.attributes
            .get(name)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    QueryError::deserialization(e.to_string())
                        .with_model(self.schema.name())
                        .with_field(name)
                })
            })
            .transpose()
    }

    /// Set an attribute.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set several attributes.
    pub fn set_many<K, V>(&mut self, attributes: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in attributes {
            self.attributes.insert(name.into(), value.into());
        }
        self
    }

    /// All current attributes, in insertion order.
    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    /// Current attributes minus the primary key.
    pub fn attributes_without_id(&self) -> Row {
        let key = self.schema.primary_key();
        self.attributes
            .iter()
            .filter(|(name, _)| name.as_str() != key)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Attributes whose value differs from the snapshot, key excluded.
    pub fn changed_attributes(&self) -> Row {
        let key = self.schema.primary_key();
        self.attributes
            .iter()
            .filter(|(name, value)| {
                name.as_str() != key && self.previous.get(name.as_str()) != Some(*value)
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Check if any attribute changed since the last read or write.
    pub fn is_dirty(&self) -> bool {
        !self.changed_attributes().is_empty()
    }

    /// Attached related data under `name`, if loaded.
    pub fn related(&self, name: &str) -> Option<&Related> {
        self.related.get(name)
    }

    /// The related entity under a loaded to-one relation.
    pub fn related_one(&self, name: &str) -> Option<&Entity> {
        self.related.get(name).and_then(Related::as_one)
    }

    /// The related entities under a loaded to-many relation; empty when not
    /// loaded.
    pub fn related_many(&self, name: &str) -> &[Entity] {
        self.related
            .get(name)
            .and_then(Related::as_many)
            .unwrap_or(&[])
    }

    /// Loaded relations, in attach order.
    pub fn loaded_relations(&self) -> impl Iterator<Item = (&str, &Related)> {
        self.related.iter().map(|(name, related)| (name.as_str(), related))
    }

    /// Attach related data, replacing a previous attachment.
    pub(crate) fn set_related(&mut self, name: &str, related: Related) -> QueryResult<()> {
        if !self.schema.has_relation(name) {
            return Err(QueryError::unknown_relation(self.schema.name(), name));
        }
        self.related.insert(name.to_string(), related);
        Ok(())
    }

    pub(crate) fn replace_row(&mut self, row: Row) {
        self.previous = row.clone();
        self.attributes = row;
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.previous = self.attributes.clone();
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.attributes == other.attributes
            && self.related == other.related
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.schema.name())
            .field("attributes", &self.attributes)
            .field("related", &self.related)
            .finish()
    }
}
