use super::MappingProvider;
use crate::class::{ClassDescriptor, PropertyDescriptor};
use crate::schema::{Column, Relationship, Table};

use indexmap::IndexMap;

/// Metadata registered explicitly, keyed by class name and by
/// `Class::property`.
///
/// Useful for classes whose declarations cannot be changed, or to override
/// individual fields that the declarations leave unset.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    tables: IndexMap<String, Table>,
    columns: IndexMap<String, Column>,
    relationships: IndexMap<String, Relationship>,
}

impl StaticProvider {
    pub fn new() -> StaticProvider {
        StaticProvider::default()
    }

    pub fn table(mut self, class: &str, table: Table) -> StaticProvider {
        self.tables.insert(class.to_string(), table);
        self
    }

    pub fn column(mut self, class: &str, property: &str, column: Column) -> StaticProvider {
        self.columns.insert(key(class, property), column);
        self
    }

    pub fn relationship(
        mut self,
        class: &str,
        property: &str,
        relationship: Relationship,
    ) -> StaticProvider {
        self.relationships
            .insert(key(class, property), relationship);
        self
    }
}

fn key(class: &str, property: &str) -> String {
    format!("{class}::{property}")
}

impl MappingProvider for StaticProvider {
    fn table_mapping(&self, class: &ClassDescriptor) -> Option<Table> {
        self.tables.get(&class.name).cloned()
    }

    fn column_mapping(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Option<Column> {
        self.columns.get(&key(&class.name, &property.name)).cloned()
    }

    fn relationship_mapping(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Option<Relationship> {
        self.relationships
            .get(&key(&class.name, &property.name))
            .cloned()
    }
}
