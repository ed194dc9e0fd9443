use serde::{Deserialize, Serialize};

/// Aggregate function metadata for a column whose value is computed over a
/// child collection, e.g. `COUNT(policies.id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// SQL function name (`COUNT`, `SUM`, `AVG`, `MIN`, `MAX`, ...)
    pub function: String,

    /// Name of the collection property on the same class the function runs
    /// over
    pub collection_property: String,

    /// Property of the collection's child class passed to the function
    pub property: String,

    /// Explicit GROUP BY expression. When unset, the query groups by every
    /// non-aggregate selected column.
    pub group_by: Option<String>,
}

impl Aggregate {
    pub fn new(
        function: impl Into<String>,
        collection_property: impl Into<String>,
        property: impl Into<String>,
    ) -> Aggregate {
        Aggregate {
            function: function.into().to_uppercase(),
            collection_property: collection_property.into(),
            property: property.into(),
            group_by: None,
        }
    }

    pub fn group_by(mut self, expr: impl Into<String>) -> Aggregate {
        self.group_by = Some(expr.into());
        self
    }
}
