use super::Assignment;
use crate::serializer::{Column, Comma, Delimited, Formatter, Ident, Params, ToSql};
use crate::Statement;

use relmap_core::Value;

/// Builds `UPDATE ... SET ... WHERE <key>`.
#[derive(Debug, Clone)]
pub struct UpdateQueryBuilder {
    table: String,
    assignments: Vec<(String, Value)>,
    keys: Vec<(String, Value)>,
}

/// `` `table`.`column` = :param_N ``
struct KeyCondition<'a>(&'a str, &'a str, &'a Value);

impl ToSql for KeyCondition<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Column(self.0, self.1) " = " self.2);
    }
}

impl UpdateQueryBuilder {
    pub fn new(table: impl Into<String>) -> UpdateQueryBuilder {
        UpdateQueryBuilder {
            table: table.into(),
            assignments: vec![],
            keys: vec![],
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> UpdateQueryBuilder {
        self.assignments
            .push((column.into(), value.into().into_key_value()));
        self
    }

    /// Restricts the update to rows whose `column` equals `value`.
    pub fn key(mut self, column: impl Into<String>, value: impl Into<Value>) -> UpdateQueryBuilder {
        self.keys.push((column.into(), value.into().into_key_value()));
        self
    }

    /// Returns `None` when there is nothing to assign, or when a key is
    /// missing or null: an UPDATE without a complete key is never
    /// generated.
    pub fn build(&self) -> Option<Statement> {
        if self.assignments.is_empty()
            || self.keys.is_empty()
            || self.keys.iter().any(|(_, value)| value.is_null())
        {
            return None;
        }

        let mut params = relmap_core::Params::new();
        let mut sql = String::new();
        let f = &mut Formatter::new(&mut sql, &mut params);

        let assignments = self
            .assignments
            .iter()
            .map(|(column, value)| Assignment(column, value));
        let keys = self
            .keys
            .iter()
            .map(|(column, value)| KeyCondition(&self.table, column, value));

        fmt!(f, "UPDATE " Ident(&self.table) " SET " Comma(assignments) " WHERE " Delimited(keys, " AND "));

        Some(Statement::new(sql, params))
    }
}
