//! Deriving table and column names that metadata leaves unset.

use crate::mapping::PropertyMapping;

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};

/// What kind of identifier is being named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Table,
    Column,
    JoinTable,
    JoinColumn,
}

/// Converts property and class names into physical identifiers.
pub trait NamingStrategy: Debug + Send + Sync {
    /// Converts `name`. When naming a column, `mapping` is the property
    /// mapping being resolved, if one exists yet.
    fn convert_name(&self, name: &str, kind: NameKind, mapping: Option<&PropertyMapping>)
        -> String;

    fn depluralize(&self, name: &str) -> String;
}

/// `ContactDetail` becomes `contact_detail`, `lastName` becomes `last_name`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

/// Names are used exactly as declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsIs;

/// The built-in strategies, selectable by name from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    #[default]
    SnakeCase,
    AsIs,
}

impl NamingStrategy for SnakeCase {
    fn convert_name(&self, name: &str, _: NameKind, _: Option<&PropertyMapping>) -> String {
        name.to_snake_case()
    }

    fn depluralize(&self, name: &str) -> String {
        depluralize(name)
    }
}

impl NamingStrategy for AsIs {
    fn convert_name(&self, name: &str, _: NameKind, _: Option<&PropertyMapping>) -> String {
        name.to_string()
    }

    fn depluralize(&self, name: &str) -> String {
        depluralize(name)
    }
}

/// Singular form of the last word of a snake_case name.
fn depluralize(name: &str) -> String {
    match name.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralizer::pluralize(last, 1, false)),
        None => pluralizer::pluralize(name, 1, false),
    }
}

impl NamingConvention {
    pub fn parse(name: &str) -> Option<NamingConvention> {
        match name.trim().to_snake_case().as_str() {
            "snake_case" | "snake" => Some(NamingConvention::SnakeCase),
            "as_is" | "none" => Some(NamingConvention::AsIs),
            _ => None,
        }
    }

    pub fn strategy(self) -> Arc<dyn NamingStrategy> {
        match self {
            NamingConvention::SnakeCase => Arc::new(SnakeCase),
            NamingConvention::AsIs => Arc::new(AsIs),
        }
    }
}

/// Fills in names that no provider supplied.
///
/// Tables and columns have separate strategies. Join columns follow the
/// `<singular table>_<key>` convention.
#[derive(Debug, Clone)]
pub struct NameResolver {
    table: Arc<dyn NamingStrategy>,
    column: Arc<dyn NamingStrategy>,
}

impl NameResolver {
    pub fn new(table: Arc<dyn NamingStrategy>, column: Arc<dyn NamingStrategy>) -> NameResolver {
        NameResolver { table, column }
    }

    pub fn table_name(&self, class: &str) -> String {
        self.table.convert_name(class, NameKind::Table, None)
    }

    pub fn column_name(&self, property: &str, mapping: Option<&PropertyMapping>) -> String {
        self.column.convert_name(property, NameKind::Column, mapping)
    }

    /// Foreign key column for an owning to-one property, e.g. `user_id` for
    /// `user`.
    pub fn foreign_key_column(&self, property: &str, target_key: &str) -> String {
        let base = self.column.convert_name(property, NameKind::JoinColumn, None);
        format!("{base}_{target_key}")
    }

    /// Join table for a many-to-many relationship between two tables.
    pub fn join_table_name(&self, owner_table: &str, child_table: &str) -> String {
        self.table.convert_name(
            &format!("{owner_table}_{child_table}"),
            NameKind::JoinTable,
            None,
        )
    }

    /// Column of a join table referencing `table`, e.g. `user_id` for
    /// `users`.
    pub fn join_table_column(&self, table: &str, key: &str) -> String {
        let singular = self.table.depluralize(table);
        self.column.convert_name(
            &format!("{singular}_{key}"),
            NameKind::JoinColumn,
            None,
        )
    }
}

impl Default for NameResolver {
    fn default() -> NameResolver {
        NameResolver::new(Arc::new(SnakeCase), Arc::new(SnakeCase))
    }
}
