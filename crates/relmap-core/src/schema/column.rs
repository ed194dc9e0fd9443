use super::{fill, Aggregate, DataMap, DataType};

use serde::{Deserialize, Serialize};

/// Maps one scalar property to one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: Option<String>,

    /// Storage data type
    pub ty: Option<DataType>,

    /// Format string for string-formatted dates or numbers
    pub format: Option<String>,

    pub primary_key: Option<bool>,

    pub auto_increment: Option<bool>,

    /// Explicitly read-only (`Some(true)`), explicitly writable
    /// (`Some(false)`) or inferred from context (`None`).
    pub read_only: Option<bool>,

    /// Set when the column value is computed by an aggregate function
    pub aggregate: Option<Aggregate>,

    /// Translation between raw stored values and entity values
    pub data_map: Option<DataMap>,
}

impl Column {
    pub fn named(name: impl Into<String>) -> Column {
        Column {
            name: Some(name.into()),
            ..Column::default()
        }
    }

    pub fn ty(mut self, ty: DataType) -> Column {
        self.ty = Some(ty);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Column {
        self.format = Some(format.into());
        self
    }

    pub fn primary_key(mut self) -> Column {
        self.primary_key = Some(true);
        self
    }

    pub fn auto_increment(mut self) -> Column {
        self.auto_increment = Some(true);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Column {
        self.read_only = Some(read_only);
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Column {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn data_map(mut self, data_map: DataMap) -> Column {
        self.data_map = Some(data_map);
        self
    }

    /// Returns `true` if no field has been set.
    pub fn is_empty(&self) -> bool {
        *self == Column::default()
    }

    /// Fills any unset field from `other`.
    pub fn merge(&mut self, other: Column) {
        fill(&mut self.name, other.name);
        fill(&mut self.ty, other.ty);
        fill(&mut self.format, other.format);
        fill(&mut self.primary_key, other.primary_key);
        fill(&mut self.auto_increment, other.auto_increment);
        fill(&mut self.read_only, other.read_only);
        fill(&mut self.aggregate, other.aggregate);
        fill(&mut self.data_map, other.data_map);
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key.unwrap_or(false)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment.unwrap_or(false)
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    /// Whether the column is excluded from INSERT and UPDATE statements.
    ///
    /// Aggregates are always read-only, as are data maps that cannot be
    /// reversed. Otherwise the explicit flag wins, falling back to
    /// `default` when unset.
    pub fn is_read_only(&self, default: bool) -> bool {
        if self.is_aggregate() {
            return true;
        }

        if let Some(data_map) = &self.data_map {
            if !data_map.is_reversible() {
                return true;
            }
        }

        self.read_only.unwrap_or(default)
    }

    /// The column name.
    ///
    /// # Panics
    ///
    /// Panics if called before names have been resolved.
    #[track_caller]
    pub fn name(&self) -> &str {
        self.name.as_deref().expect("column name not resolved")
    }
}
