use super::fill;
use crate::criteria::OrderBy;

use serde::{Deserialize, Serialize};

/// Maps one property to a child entity, a collection of child entities, or
/// a scalar value resolved through a join.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: Option<RelationshipKind>,

    /// Class of the child entity (unset for scalar joins)
    pub child_class: Option<String>,

    /// Property on the child that owns the foreign key, when this side does
    /// not
    pub mapped_by: Option<String>,

    /// Load on first access instead of joining eagerly
    pub lazy: Option<bool>,

    /// Join table for many-to-many relationships and scalar joins
    pub join_table: Option<String>,

    /// Column on the source side of the join
    pub source_join_column: Option<String>,

    /// Column on the target side of the join
    pub target_join_column: Option<String>,

    pub join_type: Option<JoinType>,

    /// Raw SQL replacing the generated join condition. Property paths may be
    /// referenced as `%path%`.
    pub join_sql: Option<String>,

    /// The child is stored in the parent's own table
    pub embedded: Option<bool>,

    /// Prefix applied to the column names of an embedded child
    pub column_prefix: Option<String>,

    /// Ordering applied to to-many collections
    pub order_by: Option<Vec<OrderBy>>,

    /// Collection type name, carried through for the host application
    pub collection_class: Option<String>,

    /// Delete children together with the parent
    pub cascade_delete: Option<bool>,

    /// Delete children detached from the parent
    pub orphan_removal: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    Scalar,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    #[default]
    Left,
}

impl RelationshipKind {
    pub fn parse(tag: &str) -> Option<RelationshipKind> {
        let tag = tag.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Some(match tag.as_str() {
            "one_to_one" | "onetoone" => RelationshipKind::OneToOne,
            "one_to_many" | "onetomany" => RelationshipKind::OneToMany,
            "many_to_one" | "manytoone" => RelationshipKind::ManyToOne,
            "many_to_many" | "manytomany" => RelationshipKind::ManyToMany,
            "scalar" => RelationshipKind::Scalar,
            _ => return None,
        })
    }

    pub fn is_to_many(self) -> bool {
        matches!(self, RelationshipKind::OneToMany | RelationshipKind::ManyToMany)
    }

    pub fn is_to_one(self) -> bool {
        matches!(self, RelationshipKind::OneToOne | RelationshipKind::ManyToOne)
    }
}

impl JoinType {
    pub fn sql(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

impl Relationship {
    pub fn new(kind: RelationshipKind) -> Relationship {
        Relationship {
            kind: Some(kind),
            ..Relationship::default()
        }
    }

    pub fn one_to_one(child_class: impl Into<String>) -> Relationship {
        Relationship::new(RelationshipKind::OneToOne).child(child_class)
    }

    pub fn one_to_many(child_class: impl Into<String>, mapped_by: impl Into<String>) -> Relationship {
        Relationship::new(RelationshipKind::OneToMany)
            .child(child_class)
            .mapped_by(mapped_by)
    }

    pub fn many_to_one(child_class: impl Into<String>) -> Relationship {
        Relationship::new(RelationshipKind::ManyToOne).child(child_class)
    }

    pub fn many_to_many(child_class: impl Into<String>) -> Relationship {
        Relationship::new(RelationshipKind::ManyToMany).child(child_class)
    }

    /// A join used only to look up a single value from `join_table`.
    pub fn scalar(
        join_table: impl Into<String>,
        source_join_column: impl Into<String>,
        target_join_column: impl Into<String>,
    ) -> Relationship {
        let mut relationship = Relationship::new(RelationshipKind::Scalar);
        relationship.join_table = Some(join_table.into());
        relationship.source_join_column = Some(source_join_column.into());
        relationship.target_join_column = Some(target_join_column.into());
        relationship
    }

    pub fn child(mut self, child_class: impl Into<String>) -> Relationship {
        self.child_class = Some(child_class.into());
        self
    }

    pub fn mapped_by(mut self, property: impl Into<String>) -> Relationship {
        self.mapped_by = Some(property.into());
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Relationship {
        self.lazy = Some(lazy);
        self
    }

    pub fn join_columns(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Relationship {
        self.source_join_column = Some(source.into());
        self.target_join_column = Some(target.into());
        self
    }

    pub fn join_table(mut self, table: impl Into<String>) -> Relationship {
        self.join_table = Some(table.into());
        self
    }

    pub fn join_type(mut self, join_type: JoinType) -> Relationship {
        self.join_type = Some(join_type);
        self
    }

    pub fn join_sql(mut self, sql: impl Into<String>) -> Relationship {
        self.join_sql = Some(sql.into());
        self
    }

    pub fn embedded(mut self, column_prefix: impl Into<String>) -> Relationship {
        self.embedded = Some(true);
        self.column_prefix = Some(column_prefix.into());
        self
    }

    pub fn order_by(mut self, order_by: Vec<OrderBy>) -> Relationship {
        self.order_by = Some(order_by);
        self
    }

    pub fn cascade_delete(mut self, cascade: bool) -> Relationship {
        self.cascade_delete = Some(cascade);
        self
    }

    pub fn orphan_removal(mut self, orphan_removal: bool) -> Relationship {
        self.orphan_removal = Some(orphan_removal);
        self
    }

    /// Returns `true` if no field has been set.
    pub fn is_empty(&self) -> bool {
        *self == Relationship::default()
    }

    /// A relationship is only defined once its kind is known.
    pub fn is_defined(&self) -> bool {
        self.kind.is_some()
    }

    /// Fills any unset field from `other`.
    pub fn merge(&mut self, other: Relationship) {
        fill(&mut self.kind, other.kind);
        fill(&mut self.child_class, other.child_class);
        fill(&mut self.mapped_by, other.mapped_by);
        fill(&mut self.lazy, other.lazy);
        fill(&mut self.join_table, other.join_table);
        fill(&mut self.source_join_column, other.source_join_column);
        fill(&mut self.target_join_column, other.target_join_column);
        fill(&mut self.join_type, other.join_type);
        fill(&mut self.join_sql, other.join_sql);
        fill(&mut self.embedded, other.embedded);
        fill(&mut self.column_prefix, other.column_prefix);
        fill(&mut self.order_by, other.order_by);
        fill(&mut self.collection_class, other.collection_class);
        fill(&mut self.cascade_delete, other.cascade_delete);
        fill(&mut self.orphan_removal, other.orphan_removal);
    }

    /// # Panics
    ///
    /// Panics if the relationship is not defined.
    #[track_caller]
    pub fn kind(&self) -> RelationshipKind {
        self.kind.expect("relationship kind not set")
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == Some(RelationshipKind::Scalar)
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded.unwrap_or(false)
    }

    pub fn is_to_many(&self) -> bool {
        self.kind.map(RelationshipKind::is_to_many).unwrap_or(false)
    }

    pub fn is_to_one(&self) -> bool {
        self.kind.map(RelationshipKind::is_to_one).unwrap_or(false)
    }

    pub fn is_many_to_many(&self) -> bool {
        self.kind == Some(RelationshipKind::ManyToMany)
    }

    /// This side holds the foreign key column.
    pub fn is_owning_side(&self) -> bool {
        self.is_to_one() && self.mapped_by.is_none() && !self.is_embedded()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy.unwrap_or(self.is_to_many())
    }

    pub fn is_cascade_delete(&self) -> bool {
        self.cascade_delete.unwrap_or(false)
    }

    pub fn is_orphan_removal(&self) -> bool {
        self.orphan_removal.unwrap_or(false)
    }

    pub fn join_type_or_default(&self) -> JoinType {
        self.join_type.unwrap_or_default()
    }

    /// # Panics
    ///
    /// Panics if called before names have been resolved.
    #[track_caller]
    pub fn source_column(&self) -> &str {
        self.source_join_column
            .as_deref()
            .expect("source join column not resolved")
    }

    /// # Panics
    ///
    /// Panics if called before names have been resolved.
    #[track_caller]
    pub fn target_column(&self) -> &str {
        self.target_join_column
            .as_deref()
            .expect("target join column not resolved")
    }
}
