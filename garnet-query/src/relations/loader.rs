//! Batched eager loading of relation trees.
//!
//! For every relation name at one level of an include tree, the loader issues
//! one fetch covering all parent entities (two for many-to-many: join rows,
//! then targets), partitions the fetched rows back onto each parent by key
//! value, and recurses into nested paths with the fetched entities as the new
//! parent set. Sibling relations at the same level are fetched concurrently.

use futures::future::try_join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

use crate::entity::{Entity, Related};
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::query::SelectQuery;
use crate::schema::ModelSchema;
use crate::traits::{BoxFuture, QueryEngine};
use crate::types::Row;

use super::include::{Include, IncludeSpec};
use super::spec::{Relation, RelationKind};

/// Default limit on include path length.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Eager-loading configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Longest accepted include path; deeper trees are rejected before any
    /// fetch.
    pub max_depth: usize,
    /// Maximum number of keys per fetch. `None` fetches every key of a level
    /// in one query.
    pub batch_size: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            batch_size: None,
        }
    }
}

impl LoaderConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum include depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Split key sets larger than `size` over several fetches. Zero means
    /// unbounded.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = (size > 0).then_some(size);
        self
    }
}

/// Hashable form of a linking column value.
///
/// Integral floats and text holding an integer in canonical form compare
/// equal to integers, so `1`, `1.0` and `"1"` all link the way a store with
/// type affinity matches them. `"01"` and `"1.0"` stay text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LinkKey {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl LinkKey {
    /// `None` for null, absent and composite values, which never link.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Some(Self::Int(f as i64))
                    }
                    _ => Some(Self::Text(n.to_string())),
                },
            },
            Value::String(s) => Some(match s.parse::<i64>() {
                Ok(i) if i.to_string() == *s => Self::Int(i),
                _ => Self::Text(s.clone()),
            }),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Distinct linking values of `column` across `entities`, in first-seen order.
fn distinct_keys(entities: &[Entity], column: &str) -> Vec<FilterValue> {
    let mut seen = HashSet::new();
    entities
        .iter()
        .filter_map(|entity| entity.get(column))
        .filter(|value| LinkKey::from_value(value).is_some_and(|key| seen.insert(key)))
        .map(FilterValue::from_json)
        .collect()
}

/// Distinct linking values of `column` across `rows`, in first-seen order.
fn distinct_row_keys(rows: &[Row], column: &str) -> Vec<FilterValue> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|value| LinkKey::from_value(value).is_some_and(|key| seen.insert(key)))
        .map(FilterValue::from_json)
        .collect()
}

/// Fetched entities of one relation, grouped by the parent linking value.
#[derive(Debug, Default)]
struct Batch {
    children: Vec<Entity>,
    groups: HashMap<LinkKey, Vec<usize>>,
}

impl Batch {
    /// Group target rows by their own remote key column.
    fn direct(relation: &Relation, rows: Vec<Row>) -> Self {
        let target = relation.target();
        let mut batch = Self::default();
        for (index, row) in rows.into_iter().enumerate() {
            if let Some(key) = row.get(relation.remote_key()).and_then(LinkKey::from_value) {
                batch.groups.entry(key).or_default().push(index);
            }
            batch.children.push(Entity::hydrate(target, row));
        }
        batch
    }

    /// Recombine target rows with join rows, in join-row order.
    fn joined(relation: &Relation, join_rows: &[Row], rows: Vec<Row>) -> Self {
        let target = relation.target();
        let mut batch = Self::default();
        let mut by_key = HashMap::new();
        for (index, row) in rows.into_iter().enumerate() {
            if let Some(key) = row.get(relation.remote_key()).and_then(LinkKey::from_value) {
                by_key.entry(key).or_insert(index);
            }
            batch.children.push(Entity::hydrate(target, row));
        }

        if let Some(join) = relation.join_table() {
            for row in join_rows {
                let source = row.get(&join.source_column).and_then(LinkKey::from_value);
                let target_key = row.get(&join.target_column).and_then(LinkKey::from_value);
                if let (Some(source), Some(target_key)) = (source, target_key) {
                    if let Some(&index) = by_key.get(&target_key) {
                        batch.groups.entry(source).or_default().push(index);
                    }
                }
            }
        }
        batch
    }

    /// Related data for one parent.
    fn related_for(&self, relation: &Relation, parent: &Entity) -> Related {
        let indices = parent
            .get(relation.local_key())
            .and_then(LinkKey::from_value)
            .and_then(|key| self.groups.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        match relation.kind() {
            RelationKind::BelongsTo => Related::One(
                indices
                    .first()
                    .and_then(|&index| self.children.get(index))
                    .map(|entity| Box::new(entity.clone())),
            ),
            RelationKind::HasMany | RelationKind::BelongsToMany => Related::Many(
                indices
                    .iter()
                    .filter_map(|&index| self.children.get(index))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

/// Eager loader resolving include trees against a [`QueryEngine`].
///
/// ```rust,ignore
/// let mut users = User::find_many(&engine).exec().await?;
/// RelationLoader::new(&engine)
///     .load(&mut users, ["place.address", "things"])
///     .await?;
/// ```
pub struct RelationLoader<E: QueryEngine> {
    engine: E,
    config: LoaderConfig,
}

impl<E: QueryEngine> RelationLoader<E> {
    /// Create a new relation loader.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: LoaderConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum include depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config = self.config.max_depth(depth);
        self
    }

    /// Set the batch size for relation fetches.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.config = self.config.batch_size(size);
        self
    }

    /// Get the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Get the configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Parse dotted relation paths and load them onto `entities`.
    pub async fn load<I, S>(&self, entities: &mut [Entity], paths: I) -> QueryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let include = Include::parse(paths)?;
        self.load_include(entities, &include).await
    }

    /// Load an include tree onto `entities`.
    ///
    /// All entities must belong to the same model. The whole tree is
    /// validated before the first fetch.
    pub async fn load_include(&self, entities: &mut [Entity], include: &Include) -> QueryResult<()> {
        let Some(schema) = entities.first().map(Entity::schema) else {
            return Ok(());
        };
        if let Some(other) = entities.iter().find(|entity| entity.schema() != schema) {
            return Err(QueryError::invalid_configuration(format!(
                "cannot eager load a mixed set of {} and {} entities",
                schema.name(),
                other.schema().name()
            )));
        }

        include.validate(schema, self.config.max_depth)?;
        self.resolve(schema, entities, include).await
    }

    fn resolve<'a>(
        &'a self,
        schema: &'static ModelSchema,
        entities: &'a mut [Entity],
        include: &'a Include,
    ) -> BoxFuture<'a, QueryResult<()>> {
        Box::pin(async move {
            if entities.is_empty() || include.is_empty() {
                return Ok(());
            }

            let parents: &[Entity] = entities;
            let batches = try_join_all(
                include
                    .specs()
                    .map(|spec| self.load_relation(schema, parents, spec)),
            )
            .await?;

            for (relation, batch) in batches {
                for parent in entities.iter_mut() {
                    let related = batch.related_for(&relation, parent);
                    parent.set_related(relation.name(), related)?;
                }
            }
            Ok(())
        })
    }

    async fn load_relation(
        &self,
        schema: &'static ModelSchema,
        parents: &[Entity],
        spec: &IncludeSpec,
    ) -> QueryResult<(Relation, Batch)> {
        let relation = schema.relation(&spec.relation_name)?;
        let mut batch = self.fetch(&relation, parents).await?;
        if spec.has_nested() {
            self.resolve(relation.target(), &mut batch.children, &spec.nested)
                .await?;
        }
        Ok((relation, batch))
    }

    #[instrument(
        skip_all,
        fields(
            model = %relation.owner().name(),
            relation = %relation.name(),
            kind = %relation.kind(),
            parents = parents.len(),
        )
    )]
    async fn fetch(&self, relation: &Relation, parents: &[Entity]) -> QueryResult<Batch> {
        let keys = distinct_keys(parents, relation.local_key());
        if keys.is_empty() {
            crate::garnet_debug!("no linking values, skipping fetch");
            return Ok(Batch::default());
        }
        debug!(keys = keys.len(), "batch fetching relation");

        match relation.join_table() {
            None => {
                let rows = self
                    .select_chunked(keys, |chunk| relation.target_query(chunk))
                    .await?;
                Ok(Batch::direct(relation, rows))
            }
            Some(join) => {
                let join_rows = self.select_chunked(keys, |chunk| join.query(chunk)).await?;
                let target_keys = distinct_row_keys(&join_rows, &join.target_column);
                if target_keys.is_empty() {
                    crate::garnet_debug!("join table has no rows for these parents");
                    return Ok(Batch::default());
                }
                let rows = self
                    .select_chunked(target_keys, |chunk| relation.target_query(chunk))
                    .await?;
                Ok(Batch::joined(relation, &join_rows, rows))
            }
        }
    }

    async fn select_chunked<F>(&self, keys: Vec<FilterValue>, build: F) -> QueryResult<Vec<Row>>
    where
        F: Fn(Vec<FilterValue>) -> SelectQuery + Send,
    {
        let chunk_size = self.config.batch_size.unwrap_or(keys.len()).max(1);
        let mut rows = Vec::new();
        for chunk in keys.chunks(chunk_size) {
            let query = build(chunk.to_vec());
            rows.extend(self.engine.select(&query).await?);
        }
        Ok(rows)
    }
}

impl<E: QueryEngine + Clone> Clone for RelationLoader<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: self.config,
        }
    }
}
