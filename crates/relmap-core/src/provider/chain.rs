use super::{AttributeProvider, MappingProvider};
use crate::class::{ClassDescriptor, PropertyDescriptor};
use crate::schema::{Column, Relationship, Table};

/// An ordered list of providers merged first-set-wins.
///
/// Earlier providers take precedence: a later provider can only fill fields
/// that are still unset. The chain reports metadata as found when any
/// provider returned some.
#[derive(Debug)]
pub struct ProviderChain {
    providers: Vec<Box<dyn MappingProvider>>,
}

impl ProviderChain {
    pub fn new() -> ProviderChain {
        ProviderChain { providers: vec![] }
    }

    pub fn with(mut self, provider: impl MappingProvider + 'static) -> ProviderChain {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderChain {
    fn default() -> ProviderChain {
        ProviderChain::new().with(AttributeProvider)
    }
}

fn merge_all<T>(
    records: impl Iterator<Item = Option<T>>,
    merge: impl Fn(&mut T, T),
) -> Option<T> {
    let mut merged: Option<T> = None;
    for record in records.flatten() {
        match &mut merged {
            Some(merged) => merge(merged, record),
            None => merged = Some(record),
        }
    }
    merged
}

impl MappingProvider for ProviderChain {
    fn table_mapping(&self, class: &ClassDescriptor) -> Option<Table> {
        merge_all(
            self.providers.iter().map(|p| p.table_mapping(class)),
            Table::merge,
        )
    }

    fn column_mapping(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Option<Column> {
        merge_all(
            self.providers
                .iter()
                .map(|p| p.column_mapping(class, property)),
            Column::merge,
        )
    }

    fn relationship_mapping(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Option<Relationship> {
        merge_all(
            self.providers
                .iter()
                .map(|p| p.relationship_mapping(class, property)),
            Relationship::merge,
        )
    }
}
