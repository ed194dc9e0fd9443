use super::MappingProvider;
use crate::class::{ClassDescriptor, PropertyDescriptor};
use crate::schema::{Column, Relationship, Table};

/// Reads the metadata declared on the class descriptors themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeProvider;

impl MappingProvider for AttributeProvider {
    fn table_mapping(&self, class: &ClassDescriptor) -> Option<Table> {
        class.table.clone().filter(|table| !table.is_empty())
    }

    fn column_mapping(
        &self,
        _class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Option<Column> {
        property.column.clone().filter(|column| !column.is_empty())
    }

    fn relationship_mapping(
        &self,
        _class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Option<Relationship> {
        property
            .relationship
            .clone()
            .filter(|relationship| !relationship.is_empty())
    }
}
