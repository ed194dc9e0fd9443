use super::{CriteriaExpression, Operator, Qb};
use crate::{Error, Result, Value};

use serde_json::Map;

/// Raw criteria in any of the accepted input shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// No filtering
    None,

    /// Key-value pairs (`{"status": "active"}`), a plain list of primary key
    /// values (`[1, 2, 3]`) or a single primary key value.
    Json(serde_json::Value),

    /// Already normalized expressions
    Expressions(Vec<CriteriaExpression>),
}

const RESERVED_KEYS: [&str; 6] = ["operator", "value", "value2", "aggregate", "and", "or"];

/// Normalizes raw criteria into an ordered list of expressions combined with
/// `AND`.
///
/// * A list of scalars becomes `<primary key> IN (...)`; a lone scalar
///   becomes `<primary key> = value`.
/// * A map of `path => value` becomes one expression per entry: `=` for
///   scalars, `IN` for lists, `IS` for null. An entry whose value is a map
///   with `operator` / `value` / `value2` / `aggregate` / `and` / `or` keys
///   describes a richer expression; the `and` and `or` sub-keys are
///   normalized recursively into the nested lists. Any other map value nests
///   the property path (`{"contact": {"lastName": "x"}}` is
///   `contact.lastName`).
/// * Expressions are passed through untouched, so normalizing normalized
///   criteria changes nothing.
pub fn normalize(criteria: impl Into<Criteria>, pk_property: &str) -> Result<Vec<CriteriaExpression>> {
    match criteria.into() {
        Criteria::None => Ok(vec![]),
        Criteria::Expressions(exprs) => Ok(exprs),
        Criteria::Json(json) => normalize_json(&json, pk_property),
    }
}

fn normalize_json(json: &serde_json::Value, pk_property: &str) -> Result<Vec<CriteriaExpression>> {
    match json {
        serde_json::Value::Null => Ok(vec![]),
        serde_json::Value::Object(map) => normalize_map(map, ""),
        serde_json::Value::Array(items) => {
            if items.iter().any(|item| item.is_object() || item.is_array()) {
                return Err(Error::query(
                    "a list of criteria must only contain primary key values; \
                     use key-value pairs to filter on properties",
                ));
            }

            Ok(vec![CriteriaExpression::new(
                pk_property,
                Operator::In,
                Value::from_json(json)?,
            )])
        }
        scalar => Ok(vec![CriteriaExpression::eq(
            pk_property,
            Value::from_json(scalar)?,
        )]),
    }
}

fn normalize_map(
    map: &Map<String, serde_json::Value>,
    prefix: &str,
) -> Result<Vec<CriteriaExpression>> {
    let mut exprs = vec![];

    for (key, value) in map {
        let property = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if property.is_empty() {
            return Err(Error::query("criteria keys must name a property"));
        }

        match value {
            serde_json::Value::Object(inner) if is_rich_expression(inner) => {
                exprs.push(rich_expression(property, inner)?);
            }
            serde_json::Value::Object(inner) => {
                exprs.extend(normalize_map(inner, &property)?);
            }
            serde_json::Value::Array(_) => {
                exprs.push(CriteriaExpression::new(
                    property,
                    Operator::In,
                    Value::from_json(value)?,
                ));
            }
            scalar => {
                exprs.push(CriteriaExpression::eq(property, Value::from_json(scalar)?));
            }
        }
    }

    Ok(exprs)
}

fn is_rich_expression(map: &Map<String, serde_json::Value>) -> bool {
    map.keys()
        .any(|key| RESERVED_KEYS.contains(&key.to_ascii_lowercase().as_str()))
}

fn rich_expression(
    property: String,
    map: &Map<String, serde_json::Value>,
) -> Result<CriteriaExpression> {
    let mut operator = None;
    let mut value = Value::Null;
    let mut value2 = None;
    let mut aggregate = None;
    let mut and_expressions = vec![];
    let mut or_expressions = vec![];

    for (key, entry) in map {
        match key.to_ascii_lowercase().as_str() {
            "operator" => {
                let src = entry.as_str().ok_or_else(|| {
                    Error::query(format!("operator for `{property}` must be a string"))
                })?;
                operator = Some(src.parse::<Operator>()?);
            }
            "value" => value = Value::from_json(entry)?,
            "value2" => value2 = Some(Value::from_json(entry)?),
            "aggregate" => {
                aggregate = entry.as_str().map(str::to_uppercase);
            }
            "and" => and_expressions = nested(entry)?,
            "or" => or_expressions = nested(entry)?,
            other => {
                return Err(Error::query(format!(
                    "unexpected key `{other}` in criteria for `{property}`"
                )))
            }
        }
    }

    let operator = operator.unwrap_or(if value.is_list() {
        Operator::In
    } else {
        Operator::Eq
    });

    if operator == Operator::Between && value2.is_none() {
        return Err(Error::query(format!(
            "BETWEEN on `{property}` requires `value2`"
        )));
    }

    let mut expr = CriteriaExpression::new(property, operator, value);
    expr.value2 = value2;
    expr.aggregate = aggregate;
    expr.and_expressions = and_expressions;
    expr.or_expressions = or_expressions;
    Ok(expr)
}

/// `and` / `or` sub-keys hold either a map or a list of maps.
fn nested(json: &serde_json::Value) -> Result<Vec<CriteriaExpression>> {
    match json {
        serde_json::Value::Object(map) => normalize_map(map, ""),
        serde_json::Value::Array(items) => {
            let mut exprs = vec![];
            for item in items {
                let serde_json::Value::Object(map) = item else {
                    return Err(Error::query(format!(
                        "nested criteria must be key-value pairs, got `{item}`"
                    )));
                };
                exprs.extend(normalize_map(map, "")?);
            }
            Ok(exprs)
        }
        other => Err(Error::query(format!(
            "nested criteria must be key-value pairs, got `{other}`"
        ))),
    }
}

impl From<serde_json::Value> for Criteria {
    fn from(json: serde_json::Value) -> Criteria {
        Criteria::Json(json)
    }
}

impl From<Vec<CriteriaExpression>> for Criteria {
    fn from(exprs: Vec<CriteriaExpression>) -> Criteria {
        Criteria::Expressions(exprs)
    }
}

impl From<CriteriaExpression> for Criteria {
    fn from(expr: CriteriaExpression) -> Criteria {
        Criteria::Expressions(vec![expr])
    }
}

impl From<Qb> for Criteria {
    fn from(qb: Qb) -> Criteria {
        Criteria::Expressions(qb.into_expressions())
    }
}

impl From<()> for Criteria {
    fn from(_: ()) -> Criteria {
        Criteria::None
    }
}
