//! Mapping metadata records as produced by a [`MappingProvider`].
//!
//! Every field is optional so that several providers can contribute to the
//! same record: a provider only fills fields that are still unset.
//!
//! [`MappingProvider`]: crate::provider::MappingProvider

mod aggregate;
pub use aggregate::Aggregate;

mod column;
pub use column::Column;

mod data_map;
pub use data_map::{DataMap, DataMapEntry};

mod data_type;
pub use data_type::DataType;

mod relationship;
pub use relationship::{JoinType, Relationship, RelationshipKind};

mod table;
pub use table::Table;

/// Fills `dst` from `src` when `dst` is unset.
pub(crate) fn fill<T>(dst: &mut Option<T>, src: Option<T>) {
    if dst.is_none() {
        *dst = src;
    }
}
