use super::Operator;
use crate::Value;

use serde::{Deserialize, Serialize};

/// A predicate on a property path, with nested predicates attached.
///
/// A node reads as `(self AND and_1 AND ... ) OR or_1 OR ...`. A list of
/// top-level nodes is combined with `AND`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaExpression {
    /// Dot-delimited property path, e.g. `contact.lastName`
    pub property: String,

    pub operator: Operator,

    pub value: Value,

    /// Upper bound, only used by `BETWEEN`
    pub value2: Option<Value>,

    /// Aggregate function applied to the property (`COUNT`, `SUM`, ...)
    pub aggregate: Option<String>,

    pub and_expressions: Vec<CriteriaExpression>,

    pub or_expressions: Vec<CriteriaExpression>,
}

impl CriteriaExpression {
    /// Creates an expression. Equality against null is canonicalized to
    /// `IS` / `IS NOT`.
    pub fn new(
        property: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> CriteriaExpression {
        let value = value.into();
        let operator = match operator {
            Operator::Eq if value.is_null() => Operator::Is,
            Operator::Ne if value.is_null() => Operator::IsNot,
            op => op,
        };

        CriteriaExpression {
            property: property.into(),
            operator,
            value,
            value2: None,
            aggregate: None,
            and_expressions: vec![],
            or_expressions: vec![],
        }
    }

    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> CriteriaExpression {
        CriteriaExpression::new(property, Operator::Eq, value)
    }

    pub fn between(
        property: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> CriteriaExpression {
        let mut expr = CriteriaExpression::new(property, Operator::Between, lower);
        expr.value2 = Some(upper.into());
        expr
    }

    pub fn aggregate(mut self, function: impl Into<String>) -> CriteriaExpression {
        self.aggregate = Some(function.into().to_uppercase());
        self
    }

    pub fn and(mut self, expr: CriteriaExpression) -> CriteriaExpression {
        self.and_expressions.push(expr);
        self
    }

    pub fn or(mut self, expr: CriteriaExpression) -> CriteriaExpression {
        self.or_expressions.push(expr);
        self
    }

    pub fn has_children(&self) -> bool {
        !self.and_expressions.is_empty() || !self.or_expressions.is_empty()
    }

    /// Visits this node and every nested node, depth first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a CriteriaExpression)) {
        f(self);
        for expr in &self.and_expressions {
            expr.walk(f);
        }
        for expr in &self.or_expressions {
            expr.walk(f);
        }
    }

    /// Evaluates the expression tree against property values supplied by
    /// `lookup`.
    pub fn evaluate(&self, lookup: &impl Fn(&str) -> Value) -> bool {
        let lhs = lookup(&self.property);
        let own = self
            .operator
            .matches(&lhs, &self.value, self.value2.as_ref())
            && self.and_expressions.iter().all(|expr| expr.evaluate(lookup));

        own || self.or_expressions.iter().any(|expr| expr.evaluate(lookup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_equality_becomes_is() {
        let expr = CriteriaExpression::eq("deletedAt", Value::Null);
        assert_eq!(expr.operator, Operator::Is);

        let expr = CriteriaExpression::new("deletedAt", Operator::Ne, Value::Null);
        assert_eq!(expr.operator, Operator::IsNot);
    }

    #[test]
    fn evaluation_follows_and_before_or() {
        // (status = 'active' AND age >= 18) OR vip = true
        let expr = CriteriaExpression::eq("status", "active")
            .and(CriteriaExpression::new("age", Operator::Ge, 18))
            .or(CriteriaExpression::eq("vip", true));

        let row = |status: &str, age: i64, vip: bool| {
            let status = status.to_string();
            move |property: &str| match property {
                "status" => Value::from(status.as_str()),
                "age" => Value::from(age),
                "vip" => Value::from(vip),
                _ => Value::Null,
            }
        };

        assert!(expr.evaluate(&row("active", 30, false)));
        assert!(!expr.evaluate(&row("active", 12, false)));
        assert!(expr.evaluate(&row("closed", 12, true)));
    }
}
