use super::{join_path, path_alias};
use crate::schema::{Column, DataType, Relationship};

use serde::{Deserialize, Serialize};

/// One resolved property: where it lives in the object graph, which column
/// holds it and which relationship it follows.
///
/// A property is either a stored scalar (`column` set) or a relationship to
/// a child entity (`relationship` set). Scalar joins carry both: the
/// relationship describes the join and the column the looked-up value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMapping {
    /// Class declaring the property
    pub class_name: String,

    pub property_name: String,

    /// Property names leading from the root entity to the declaring object
    pub parents: Vec<String>,

    /// Result-set column alias
    pub alias: String,

    /// Alias of the table holding the column in a generated query
    pub table_alias: String,

    pub column: Option<Column>,

    pub relationship: Option<Relationship>,

    /// Where a relationship leads, once names are resolved
    pub target: Option<RelationshipTarget>,

    /// Source column of an aggregate column
    pub aggregate_source: Option<AggregateSource>,
}

/// The resolved far side of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTarget {
    /// Child class; unset for scalar joins
    pub class_name: Option<String>,

    /// Child table, or the lookup table of a scalar join
    pub table: String,

    /// Alias of `table` in generated queries
    pub alias: String,

    /// Alias of the join table of a many-to-many relationship
    pub link_alias: Option<String>,

    /// Key column of the owning entity
    pub owner_key: String,

    /// Key column of the child entity
    pub child_key: Option<String>,

    /// The child's properties are part of the same mapping collection and
    /// are joined in the same query. Relationships that are not expanded are
    /// loaded lazily.
    pub expanded: bool,
}

/// The column an aggregate function runs over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSource {
    /// Path of the to-many relationship joined for the aggregate
    pub relationship_path: String,

    /// Alias of the child table in generated queries
    pub table_alias: String,

    pub column: String,
}

impl PropertyMapping {
    pub fn new(class_name: impl Into<String>, property_name: impl Into<String>, parents: Vec<String>) -> PropertyMapping {
        let property_name = property_name.into();
        let alias = path_alias(&join_path(&parents, &property_name));
        PropertyMapping {
            class_name: class_name.into(),
            property_name,
            parents,
            alias,
            table_alias: String::new(),
            column: None,
            relationship: None,
            target: None,
            aggregate_source: None,
        }
    }

    /// Dot-delimited path from the root entity.
    pub fn path(&self) -> String {
        join_path(&self.parents, &self.property_name)
    }

    pub fn parent_path(&self) -> String {
        self.parents.join(".")
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Column name without the table.
    ///
    /// For an owning to-one relationship this is the foreign key column.
    pub fn short_column_name(&self) -> Option<&str> {
        if let Some(column) = self.foreign_key_column() {
            return Some(column);
        }
        self.column.as_ref().and_then(|column| column.name.as_deref())
    }

    /// Delimited column reference qualified by the table alias, e.g.
    /// `` `obj_alias_contact`.`last_name` ``.
    pub fn full_column_name(&self) -> Option<String> {
        let table_alias = match self.target.as_ref() {
            Some(target) if self.is_scalar_join() => &target.alias,
            _ => &self.table_alias,
        };
        self.short_column_name()
            .map(|column| format!("`{table_alias}`.`{column}`"))
    }

    /// A relationship to a child entity, as opposed to a scalar join.
    pub fn is_relationship(&self) -> bool {
        self.relationship
            .as_ref()
            .is_some_and(|rel| rel.is_defined() && !rel.is_scalar())
    }

    pub fn is_scalar_join(&self) -> bool {
        self.relationship.as_ref().is_some_and(Relationship::is_scalar)
    }

    /// Holds a value selected from a column.
    pub fn is_column(&self) -> bool {
        self.column.is_some() && !self.is_relationship()
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_column() && self.column.as_ref().is_some_and(Column::is_primary_key)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.column.as_ref().is_some_and(Column::is_auto_increment)
    }

    pub fn is_aggregate(&self) -> bool {
        self.column.as_ref().is_some_and(Column::is_aggregate)
    }

    /// Excluded from INSERT and UPDATE. Scalar joins are read-only unless
    /// declared writable.
    pub fn is_read_only(&self) -> bool {
        match &self.column {
            Some(column) => column.is_read_only(self.is_scalar_join()),
            None => true,
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.relationship.as_ref().is_some_and(Relationship::is_embedded)
    }

    pub fn is_to_many(&self) -> bool {
        self.is_relationship() && self.relationship.as_ref().is_some_and(Relationship::is_to_many)
    }

    pub fn is_to_one(&self) -> bool {
        self.is_relationship() && self.relationship.as_ref().is_some_and(Relationship::is_to_one)
    }

    pub fn is_many_to_many(&self) -> bool {
        self.relationship.as_ref().is_some_and(Relationship::is_many_to_many)
    }

    /// The child entity is joined and hydrated in the same query.
    pub fn is_expanded(&self) -> bool {
        self.target.as_ref().is_some_and(|target| target.expanded)
    }

    /// A relationship loaded on first access.
    pub fn is_lazy(&self) -> bool {
        self.is_relationship() && !self.is_expanded()
    }

    /// The owning side holds the foreign key in its own table.
    pub fn is_owning_side(&self) -> bool {
        self.is_relationship()
            && self.relationship.as_ref().is_some_and(Relationship::is_owning_side)
    }

    /// Foreign key column of an owning to-one relationship.
    pub fn foreign_key_column(&self) -> Option<&str> {
        if !self.is_owning_side() {
            return None;
        }
        self.relationship
            .as_ref()
            .and_then(|rel| rel.source_join_column.as_deref())
    }

    pub fn child_class(&self) -> Option<&str> {
        self.target.as_ref().and_then(|target| target.class_name.as_deref())
    }

    /// Path of the child entity's properties within the collection.
    pub fn child_parents(&self) -> Vec<String> {
        let mut parents = self.parents.clone();
        parents.push(self.property_name.clone());
        parents
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.column.as_ref().and_then(|column| column.ty)
    }

    pub fn format(&self) -> Option<&str> {
        self.column.as_ref().and_then(|column| column.format.as_deref())
    }
}
