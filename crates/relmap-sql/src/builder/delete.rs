use crate::serializer::{Delimited, Formatter, Ident, Params, ToSql};
use crate::Statement;

use relmap_core::Value;

/// Builds `DELETE FROM ... WHERE <key>`.
#[derive(Debug, Clone)]
pub struct DeleteQueryBuilder {
    table: String,
    keys: Vec<(String, Value)>,
}

struct Condition<'a>(&'a str, &'a Value);

impl ToSql for Condition<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Ident(self.0) " = " self.1);
    }
}

impl DeleteQueryBuilder {
    pub fn new(table: impl Into<String>) -> DeleteQueryBuilder {
        DeleteQueryBuilder {
            table: table.into(),
            keys: vec![],
        }
    }

    pub fn key(mut self, column: impl Into<String>, value: impl Into<Value>) -> DeleteQueryBuilder {
        self.keys.push((column.into(), value.into().into_key_value()));
        self
    }

    /// Returns `None` unless every key has a non-null value, so that a
    /// DELETE without a WHERE clause can never be produced.
    pub fn build(&self) -> Option<Statement> {
        if self.keys.is_empty() || self.keys.iter().any(|(_, value)| value.is_null()) {
            return None;
        }

        let mut params = relmap_core::Params::new();
        let mut sql = String::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        let keys = self
            .keys
            .iter()
            .map(|(column, value)| Condition(column, value));
        fmt!(f, "DELETE FROM " Ident(&self.table) " WHERE " Delimited(keys, " AND "));

        Some(Statement::new(sql, params))
    }
}
