use super::PropertyMapping;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Every property mapping of one root entity class, including the
/// properties of children joined into the same query.
///
/// Mappings are indexed by result-set alias, by property path, and the
/// relationships that were expanded are recorded by relationship key. A
/// collection is read-only once the mapper has populated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingCollection {
    class_name: String,
    table_name: String,
    mappings: Vec<PropertyMapping>,
    by_alias: IndexMap<String, usize>,
    by_path: IndexMap<String, usize>,
    relationship_keys: IndexMap<String, String>,
    errors: Vec<String>,
}

impl MappingCollection {
    pub fn new(class_name: impl Into<String>, table_name: impl Into<String>) -> MappingCollection {
        MappingCollection {
            class_name: class_name.into(),
            table_name: table_name.into(),
            mappings: vec![],
            by_alias: IndexMap::new(),
            by_path: IndexMap::new(),
            relationship_keys: IndexMap::new(),
            errors: vec![],
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub(crate) fn push(&mut self, mapping: PropertyMapping) {
        let index = self.mappings.len();
        self.by_alias.insert(mapping.alias.clone(), index);
        self.by_path.insert(mapping.path(), index);
        self.mappings.push(mapping);
    }

    /// Records that the relationship `key` was expanded at `path`. Returns
    /// `false` if it already was, anywhere in the graph.
    pub(crate) fn mark_relationship(&mut self, key: String, path: String) -> bool {
        if self.relationship_keys.contains_key(&key) {
            return false;
        }
        self.relationship_keys.insert(key, path);
        true
    }

    pub(crate) fn record_error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Whether the relationship `key` was expanded.
    pub fn has_relationship_key(&self, key: &str) -> bool {
        self.relationship_keys.contains_key(key)
    }

    /// Expanded relationship keys and the path each was expanded at.
    pub fn relationship_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.relationship_keys
            .iter()
            .map(|(key, path)| (key.as_str(), path.as_str()))
    }

    /// Mapping errors recorded while populating the collection.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Looks up a mapping by dot-delimited property path.
    pub fn get(&self, path: &str) -> Option<&PropertyMapping> {
        self.by_path.get(path).map(|index| &self.mappings[*index])
    }

    pub fn get_by_alias(&self, alias: &str) -> Option<&PropertyMapping> {
        self.by_alias.get(alias).map(|index| &self.mappings[*index])
    }

    /// Mappings of the object found at `parents`.
    pub fn properties_at<'a>(
        &'a self,
        parents: &'a [String],
    ) -> impl Iterator<Item = &'a PropertyMapping> + 'a {
        self.mappings
            .iter()
            .filter(move |mapping| mapping.parents == parents)
    }

    pub fn primary_keys_at<'a>(
        &'a self,
        parents: &'a [String],
    ) -> impl Iterator<Item = &'a PropertyMapping> + 'a {
        self.properties_at(parents)
            .filter(|mapping| mapping.is_primary_key())
    }

    /// Primary key mappings of the root entity.
    pub fn primary_keys(&self) -> impl Iterator<Item = &PropertyMapping> {
        self.mappings
            .iter()
            .filter(|mapping| mapping.is_root() && mapping.is_primary_key())
    }

    /// Name of the root entity's first primary key property, `id` when none
    /// is mapped.
    pub fn primary_key_property(&self) -> &str {
        self.primary_keys()
            .next()
            .map(|mapping| mapping.property_name.as_str())
            .unwrap_or("id")
    }

    /// Relationship mappings, scalar joins excluded.
    pub fn relationships(&self) -> impl Iterator<Item = &PropertyMapping> {
        self.mappings
            .iter()
            .filter(|mapping| mapping.is_relationship())
    }

    /// Class of the object found at `parents`.
    pub fn class_at(&self, parents: &[String]) -> Option<&str> {
        if parents.is_empty() {
            return Some(&self.class_name);
        }
        self.get(&parents.join(".")).and_then(|mapping| mapping.child_class())
    }

    /// Table alias of the object found at `parents`.
    pub fn table_alias_at(&self, parents: &[String]) -> Option<&str> {
        if parents.is_empty() {
            return Some(&self.table_name);
        }
        self.get(&parents.join("."))
            .and_then(|mapping| mapping.target.as_ref())
            .map(|target| target.alias.as_str())
    }

    /// Whether any to-many relationship is joined into the query.
    pub fn has_expanded_to_many(&self) -> bool {
        self.relationships()
            .any(|mapping| mapping.is_to_many() && mapping.is_expanded())
    }
}
