//! Include trees: dotted relation paths merged by shared prefix.

use indexmap::IndexMap;

use crate::error::{QueryError, QueryResult};
use crate::schema::ModelSchema;

/// One relation to include, with the relations to include beneath it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IncludeSpec {
    /// Name of the relation to include.
    pub relation_name: String,
    /// Nested includes.
    pub nested: Include,
}

impl IncludeSpec {
    /// Create a new include spec for a relation.
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            relation_name: relation_name.into(),
            nested: Include::new(),
        }
    }

    /// Include a nested relation.
    pub fn include(mut self, nested: IncludeSpec) -> Self {
        self.nested.insert(nested);
        self
    }

    /// Check if there are nested includes.
    pub fn has_nested(&self) -> bool {
        !self.nested.is_empty()
    }
}

/// A set of relations to include, keyed by relation name.
///
/// ```rust
/// use garnet_query::Include;
///
/// let include = Include::parse(["place.address", "things", "place"]).unwrap();
/// assert_eq!(include.len(), 2);
/// assert!(include.get("place").unwrap().nested.contains("address"));
/// assert_eq!(include.depth(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Include {
    specs: IndexMap<String, IncludeSpec>,
}

impl Include {
    /// Create a new empty include set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse dotted relation paths into a tree.
    ///
    /// Paths sharing a prefix are merged and duplicates collapse. Empty
    /// segments (`""`, `".a"`, `"a..b"`, `"a."`) are rejected.
    pub fn parse<I, S>(paths: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut include = Self::new();
        for path in paths {
            include.add_path(path.as_ref())?;
        }
        Ok(include)
    }

    /// Merge one dotted relation path into the tree.
    pub fn add_path(&mut self, path: &str) -> QueryResult<()> {
        let segments: Vec<&str> = path.split('.').map(str::trim).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(QueryError::invalid_relation_path(path, "empty segment"));
        }

        let mut level = self;
        for segment in segments {
            level = &mut level
                .specs
                .entry(segment.to_string())
                .or_insert_with(|| IncludeSpec::new(segment))
                .nested;
        }
        Ok(())
    }

    /// Add a spec, merging it with an existing spec of the same name.
    pub fn insert(&mut self, spec: IncludeSpec) {
        match self.specs.get_mut(&spec.relation_name) {
            Some(existing) => existing.nested.merge(spec.nested),
            None => {
                self.specs.insert(spec.relation_name.clone(), spec);
            }
        }
    }

    /// Merge another include set into this one, recursively.
    pub fn merge(&mut self, other: Include) {
        for (_, spec) in other.specs {
            self.insert(spec);
        }
    }

    /// Get an include spec by relation name.
    pub fn get(&self, relation: &str) -> Option<&IncludeSpec> {
        self.specs.get(relation)
    }

    /// Check if a relation is included at this level.
    pub fn contains(&self, relation: &str) -> bool {
        self.specs.contains_key(relation)
    }

    /// Specs at this level, in first-mention order.
    pub fn specs(&self) -> impl Iterator<Item = &IncludeSpec> {
        self.specs.values()
    }

    /// Check if there are any includes.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Get the number of includes at this level.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Length of the longest path in the tree.
    pub fn depth(&self) -> usize {
        self.specs
            .values()
            .map(|spec| 1 + spec.nested.depth())
            .max()
            .unwrap_or(0)
    }

    /// Check every relation name against the schemas it will be resolved
    /// on, and the tree depth against `max_depth`.
    pub fn validate(&self, schema: &'static ModelSchema, max_depth: usize) -> QueryResult<()> {
        let depth = self.depth();
        if depth > max_depth {
            return Err(QueryError::invalid_relation_path(
                self.longest_path(),
                format!("depth {} exceeds the maximum of {}", depth, max_depth),
            ));
        }
        self.validate_names(schema)
    }

    fn validate_names(&self, schema: &'static ModelSchema) -> QueryResult<()> {
        for spec in self.specs.values() {
            let relation = schema.relation(&spec.relation_name)?;
            spec.nested.validate_names(relation.target())?;
        }
        Ok(())
    }

    fn longest_path(&self) -> String {
        let deepest = self
            .specs
            .values()
            .max_by_key(|spec| spec.nested.depth());
        match deepest {
            Some(spec) if spec.has_nested() => {
                format!("{}.{}", spec.relation_name, spec.nested.longest_path())
            }
            Some(spec) => spec.relation_name.clone(),
            None => String::new(),
        }
    }
}

impl From<IncludeSpec> for Include {
    fn from(spec: IncludeSpec) -> Self {
        let mut include = Self::new();
        include.insert(spec);
        include
    }
}

impl FromIterator<IncludeSpec> for Include {
    fn from_iter<T: IntoIterator<Item = IncludeSpec>>(iter: T) -> Self {
        let mut include = Self::new();
        for spec in iter {
            include.insert(spec);
        }
        include
    }
}

/// Helper function to create an include spec.
pub fn include(relation: impl Into<String>) -> IncludeSpec {
    IncludeSpec::new(relation)
}
