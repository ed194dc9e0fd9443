//! Resolved mappings between entity properties, columns and relationships.

mod collection;
pub use collection::MappingCollection;

mod mapper;
pub use mapper::ObjectMapper;

mod property;
pub use property::{AggregateSource, PropertyMapping, RelationshipTarget};

/// Joins a parent path and a property name with `.`.
pub fn join_path(parents: &[String], property: &str) -> String {
    if parents.is_empty() {
        property.to_string()
    } else {
        format!("{}.{property}", parents.join("."))
    }
}

/// Result-set alias for a property path: `contact.lastName` becomes
/// `contact_lastName`.
pub fn path_alias(path: &str) -> String {
    path.replace('.', "_")
}
