use super::fill;

use serde::{Deserialize, Serialize};

/// Table metadata for an entity class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Physical table name
    pub name: Option<String>,

    /// Custom repository class to use for this entity
    pub repository_class: Option<String>,
}

impl Table {
    pub fn named(name: impl Into<String>) -> Table {
        Table {
            name: Some(name.into()),
            ..Table::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.repository_class.is_none()
    }

    /// Fills any unset field from `other`.
    pub fn merge(&mut self, other: Table) {
        fill(&mut self.name, other.name);
        fill(&mut self.repository_class, other.repository_class);
    }
}
