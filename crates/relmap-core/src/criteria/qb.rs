use super::{CriteriaExpression, Operator};
use crate::Value;

/// Fluent criteria builder.
///
/// ```
/// use relmap_core::criteria::{Operator, Qb};
///
/// // status = 'active' AND (age >= 18 OR guardian IS NOT NULL)
/// let criteria = Qb::new()
///     .filter("status", Operator::Eq, "active")
///     .filter("age", Operator::Ge, 18)
///     .or("guardian", Operator::IsNot, ())
///     .into_expressions();
///
/// assert_eq!(criteria.len(), 2);
/// assert_eq!(criteria[1].or_expressions.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Qb {
    expressions: Vec<CriteriaExpression>,
}

impl Qb {
    pub fn new() -> Qb {
        Qb::default()
    }

    /// Adds an expression to the top-level `AND` list.
    pub fn filter(
        mut self,
        property: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Qb {
        self.expressions
            .push(CriteriaExpression::new(property, operator, value));
        self
    }

    /// Same as [`Qb::filter`].
    pub fn and(
        self,
        property: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Qb {
        self.filter(property, operator, value)
    }

    /// Adds an alternative to the most recent top-level expression.
    pub fn or(
        self,
        property: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Qb {
        self.or_expr(CriteriaExpression::new(property, operator, value))
    }

    pub fn between(
        mut self,
        property: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Qb {
        self.expressions
            .push(CriteriaExpression::between(property, lower, upper));
        self
    }

    /// Adds a prebuilt expression to the top-level `AND` list.
    pub fn expr(mut self, expr: CriteriaExpression) -> Qb {
        self.expressions.push(expr);
        self
    }

    /// Adds the group built by `f` as one `AND`ed expression.
    pub fn and_group(mut self, f: impl FnOnce(Qb) -> Qb) -> Qb {
        if let Some(group) = fold(f(Qb::new()).expressions) {
            self.expressions.push(group);
        }
        self
    }

    /// Adds the group built by `f` as an alternative to the most recent
    /// top-level expression.
    pub fn or_group(self, f: impl FnOnce(Qb) -> Qb) -> Qb {
        match fold(f(Qb::new()).expressions) {
            Some(group) => self.or_expr(group),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn into_expressions(self) -> Vec<CriteriaExpression> {
        self.expressions
    }

    fn or_expr(mut self, expr: CriteriaExpression) -> Qb {
        match self.expressions.last_mut() {
            Some(last) => last.or_expressions.push(expr),
            None => self.expressions.push(expr),
        }
        self
    }
}

/// Folds an `AND` list into a single node.
fn fold(mut exprs: Vec<CriteriaExpression>) -> Option<CriteriaExpression> {
    if exprs.is_empty() {
        return None;
    }

    let mut host = exprs.remove(0);
    append_and(&mut host, &exprs);
    Some(host)
}

/// Makes `node` mean `node AND rest`. A node reads `(self AND ands) OR ors`,
/// so the conjunction is distributed into every `OR` branch.
fn append_and(node: &mut CriteriaExpression, rest: &[CriteriaExpression]) {
    if rest.is_empty() {
        return;
    }

    node.and_expressions.extend_from_slice(rest);
    for branch in &mut node.or_expressions {
        append_and(branch, rest);
    }
}
