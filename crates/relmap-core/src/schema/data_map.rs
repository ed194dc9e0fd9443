use crate::{criteria::Operator, Value};

use serde::{Deserialize, Serialize};

/// Translates between raw stored values and the values seen on entities,
/// e.g. `'A' => "Active"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataMap {
    pub entries: Vec<DataMapEntry>,

    /// Value used when no entry matches
    pub else_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMapEntry {
    /// Stored value, compared against the raw column value
    pub raw: Value,

    /// Value seen on the entity
    pub display: Value,

    /// How the raw column value is compared against `raw`
    pub operator: Operator,
}

impl DataMap {
    pub fn new() -> DataMap {
        DataMap::default()
    }

    /// Adds an equality entry.
    pub fn entry(self, raw: impl Into<Value>, display: impl Into<Value>) -> DataMap {
        self.entry_with(Operator::Eq, raw, display)
    }

    /// Adds an entry compared with the given operator.
    pub fn entry_with(
        mut self,
        operator: Operator,
        raw: impl Into<Value>,
        display: impl Into<Value>,
    ) -> DataMap {
        self.entries.push(DataMapEntry {
            raw: raw.into(),
            display: display.into(),
            operator,
        });
        self
    }

    pub fn otherwise(mut self, display: impl Into<Value>) -> DataMap {
        self.else_value = Some(display.into());
        self
    }

    /// A map can be reversed only when every entry uses plain equality and
    /// there is no else-clause; otherwise several raw values translate to
    /// the same display value.
    pub fn is_reversible(&self) -> bool {
        self.else_value.is_none()
            && self
                .entries
                .iter()
                .all(|entry| entry.operator == Operator::Eq)
    }

    /// Translates a raw stored value into the value seen on the entity.
    pub fn translate(&self, raw: &Value) -> Value {
        self.entries
            .iter()
            .find(|entry| entry.operator.matches(raw, &entry.raw, None))
            .map(|entry| entry.display.clone())
            .or_else(|| self.else_value.clone())
            .unwrap_or_else(|| raw.clone())
    }

    /// Translates an entity value back into the stored value. Returns
    /// `None` when the map is not reversible or nothing matches.
    pub fn reverse(&self, display: &Value) -> Option<Value> {
        if !self.is_reversible() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| entry.display.loosely_eq(display))
            .map(|entry| entry.raw.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_map_round_trips() {
        let map = DataMap::new().entry("A", "Active").entry("I", "Inactive");

        assert!(map.is_reversible());
        assert_eq!(map.translate(&Value::from("A")), Value::from("Active"));
        assert_eq!(map.reverse(&Value::from("Inactive")), Some(Value::from("I")));
        assert_eq!(map.translate(&Value::from("X")), Value::from("X"));
    }

    #[test]
    fn range_entries_and_else_are_not_reversible() {
        let map = DataMap::new()
            .entry_with(Operator::Ge, 18, "adult")
            .otherwise("minor");

        assert!(!map.is_reversible());
        assert_eq!(map.translate(&Value::from(40)), Value::from("adult"));
        assert_eq!(map.translate(&Value::from(3)), Value::from("minor"));
        assert_eq!(map.reverse(&Value::from("adult")), None);
    }
}
