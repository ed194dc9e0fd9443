use super::Assignment;
use crate::serializer::{to_sql, Comma, Formatter, Ident, ToSql};
use crate::Statement;

use relmap_core::Value;

/// Builds `INSERT INTO ... SET ...`.
///
/// In replace mode the assignments are repeated in an
/// `ON DUPLICATE KEY UPDATE` clause, reusing the same placeholders.
#[derive(Debug, Clone)]
pub struct InsertQueryBuilder {
    table: String,
    assignments: Vec<(String, Value)>,
    replace: bool,
}

impl InsertQueryBuilder {
    pub fn new(table: impl Into<String>) -> InsertQueryBuilder {
        InsertQueryBuilder {
            table: table.into(),
            assignments: vec![],
            replace: false,
        }
    }

    /// Assigns `value` to `column`. Entity references are reduced to their
    /// key.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> InsertQueryBuilder {
        self.assignments
            .push((column.into(), value.into().into_key_value()));
        self
    }

    pub fn replace(mut self, replace: bool) -> InsertQueryBuilder {
        self.replace = replace;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn build(&self) -> Statement {
        let mut params = relmap_core::Params::new();

        if self.assignments.is_empty() {
            let sql = to_sql(Ident(&self.table), &mut params);
            return Statement::new(format!("INSERT INTO {sql} () VALUES ()"), params);
        }

        let assignments = to_sql(
            Comma(
                self.assignments
                    .iter()
                    .map(|(column, value)| Assignment(column, value)),
            ),
            &mut params,
        );

        let mut sql = String::new();
        let f = &mut Formatter::new(&mut sql, &mut params);
        fmt!(f, "INSERT INTO " Ident(&self.table) " SET " assignments.as_str());

        if self.replace {
            fmt!(f, " ON DUPLICATE KEY UPDATE " assignments.as_str());
        }

        Statement::new(sql, params)
    }
}
