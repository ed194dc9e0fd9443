use crate::replacer::{unknown_property, SqlStringReplacer};
use crate::serializer::{Comma, Formatter, Params, ToSql};

use relmap_core::{CriteriaExpression, Operator, PropertyMapping, Result, Value};

/// Renders criteria trees as WHERE or HAVING conditions.
pub(super) struct CriteriaSerializer<'r, 'a> {
    replacer: &'r SqlStringReplacer<'a>,
}

/// A bound criteria value, converted for its column.
struct Bound(Value);

impl ToSql for Bound {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        self.0.to_sql(f);
    }
}

impl<'r, 'a> CriteriaSerializer<'r, 'a> {
    pub(super) fn new(replacer: &'r SqlStringReplacer<'a>) -> CriteriaSerializer<'r, 'a> {
        CriteriaSerializer { replacer }
    }

    /// Conditions on aggregates belong in HAVING.
    pub(super) fn is_having(&self, expr: &CriteriaExpression) -> bool {
        expr.aggregate.is_some()
            || self
                .replacer
                .lookup(&expr.property)
                .is_some_and(|(mapping, _)| mapping.is_aggregate())
    }

    /// Renders top-level expressions joined with `AND`. Nodes with nested
    /// expressions are parenthesized.
    pub(super) fn serialize(
        &self,
        exprs: &[&CriteriaExpression],
        params: &mut relmap_core::Params,
    ) -> Result<String> {
        let mut parts = Vec::with_capacity(exprs.len());

        for expr in exprs {
            let node = self.node(expr, params)?;
            if expr.has_children() {
                parts.push(format!("({node})"));
            } else {
                parts.push(node);
            }
        }

        Ok(parts.join(" AND "))
    }

    fn node(&self, expr: &CriteriaExpression, params: &mut relmap_core::Params) -> Result<String> {
        let mut sql = self.predicate(expr, params)?;

        for child in &expr.and_expressions {
            let child = self.node(child, params)?;
            sql.push_str(&format!(" AND ({child})"));
        }

        for child in &expr.or_expressions {
            let child = self.node(child, params)?;
            sql.push_str(&format!(" OR ({child})"));
        }

        Ok(sql)
    }

    fn predicate(
        &self,
        expr: &CriteriaExpression,
        params: &mut relmap_core::Params,
    ) -> Result<String> {
        let (mapping, _) = self
            .replacer
            .lookup(&expr.property)
            .ok_or_else(|| unknown_property(self.replacer.collection(), &expr.property))?;

        let column = self
            .replacer
            .column_for(&expr.property)
            .ok_or_else(|| unknown_property(self.replacer.collection(), &expr.property))?;

        let lhs = match &expr.aggregate {
            Some(function) if !mapping.is_aggregate() => format!("{function}({column})"),
            _ => column,
        };

        let mut sql = String::new();
        let f = &mut Formatter::new(&mut sql, params);

        if let Some(rhs) = self.column_reference(&expr.value) {
            fmt!(f, &lhs " " expr.operator.sql() " " rhs);
            return Ok(sql);
        }

        match expr.operator {
            op @ (Operator::Is | Operator::IsNot) => match &expr.value {
                Value::Null => fmt!(f, &lhs " " op.sql() " NULL"),
                Value::Bool(true) => fmt!(f, &lhs " " op.sql() " TRUE"),
                Value::Bool(false) => fmt!(f, &lhs " " op.sql() " FALSE"),
                value => fmt!(f, &lhs " " op.sql() " " self.bind(mapping, value)),
            },
            op @ (Operator::In | Operator::NotIn) => {
                let items = match &expr.value {
                    Value::List(items) => items.clone(),
                    value => vec![value.clone()],
                };

                if items.is_empty() {
                    // Nothing is in an empty list
                    let always = if op == Operator::In { "1 = 0" } else { "1 = 1" };
                    fmt!(f, always);
                } else {
                    let items = items.iter().map(|item| self.bind(mapping, item));
                    fmt!(f, &lhs " " op.sql() " (" Comma(items) ")");
                }
            }
            Operator::Between => {
                let upper = expr.value2.clone().unwrap_or_default();
                fmt!(f, &lhs " BETWEEN " self.bind(mapping, &expr.value) " AND " self.bind(mapping, &upper));
            }
            op @ (Operator::Contains | Operator::BeginsWith | Operator::EndsWith) => {
                let text = expr.value.to_string_value()?;
                let text = escape_like(&text);
                let pattern = match op {
                    Operator::Contains => format!("%{text}%"),
                    Operator::BeginsWith => format!("{text}%"),
                    _ => format!("%{text}"),
                };
                fmt!(f, &lhs " LIKE " Value::String(pattern));
            }
            op => fmt!(f, &lhs " " op.sql() " " self.bind(mapping, &expr.value)),
        }

        Ok(sql)
    }

    /// A backtick-delimited value naming a mapped property compares against
    /// that column. Every other value is bound.
    fn column_reference(&self, value: &Value) -> Option<String> {
        let name = value.as_str()?;
        let path = name.strip_prefix('`')?.strip_suffix('`')?;
        if path.is_empty() || path.contains('`') {
            return None;
        }
        self.replacer.column_for(path)
    }

    /// Converts a value to its stored form: entities become their key, data
    /// maps are reversed and the column type decides the representation.
    fn bind(&self, mapping: &PropertyMapping, value: &Value) -> Bound {
        let mut value = value.clone().into_key_value();

        let data_map = mapping.column.as_ref().and_then(|column| column.data_map.as_ref());
        if let Some(raw) = data_map.and_then(|data_map| data_map.reverse(&value)) {
            value = raw;
        }

        let mut converted = value.clone();
        if self.replacer.handler().to_persistence_value(
            &mut converted,
            mapping.data_type(),
            mapping.format(),
        ) {
            value = converted;
        }

        Bound(value)
    }
}

/// Escapes the `LIKE` wildcards in `text`.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
