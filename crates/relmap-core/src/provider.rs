//! Sources of mapping metadata.
//!
//! A [`MappingProvider`] answers, for one class or property, whatever
//! metadata it knows about. Providers are combined with [`ProviderChain`]:
//! each provider only fills the fields left unset by the ones before it.

mod attribute;
pub use attribute::AttributeProvider;

mod chain;
pub use chain::ProviderChain;

mod registered;
pub use registered::StaticProvider;

use crate::class::{ClassDescriptor, PropertyDescriptor};
use crate::schema::{Column, Relationship, Table};

use std::fmt::Debug;

/// Returns table, column and relationship metadata for classes and
/// properties.
///
/// Each method returns `None` when the provider has no information, as
/// opposed to a defaulted record.
pub trait MappingProvider: Debug + Send + Sync {
    fn table_mapping(&self, class: &ClassDescriptor) -> Option<Table>;

    fn column_mapping(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Option<Column>;

    fn relationship_mapping(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Option<Relationship>;
}
