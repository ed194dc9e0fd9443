use crate::{Error, Value};

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

/// Canonical comparison operator.
///
/// Every accepted spelling of an operator parses to exactly one variant, so
/// nothing downstream ever inspects user-supplied operator strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Between,
    Like,
    Contains,
    BeginsWith,
    EndsWith,
    Is,
    IsNot,
}

impl Operator {
    /// Parses an operator, accepting symbols, mnemonics and spelled-out
    /// names in any case. Underscores, hyphens and runs of whitespace are
    /// treated alike.
    pub fn parse(src: &str) -> Option<Operator> {
        let normalized = src
            .trim()
            .to_ascii_uppercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Some(match normalized.as_str() {
            "=" | "==" | "EQ" | "EQUAL" | "EQUALS" => Operator::Eq,
            "!=" | "<>" | "NE" | "NEQ" | "NOT EQUAL" | "NOT EQUALS" => Operator::Ne,
            ">" | "GT" | "GREATER THAN" => Operator::Gt,
            ">=" | "GE" | "GTE" | "GREATER THAN OR EQUAL" => Operator::Ge,
            "<" | "LT" | "LESS THAN" => Operator::Lt,
            "<=" | "LE" | "LTE" | "LESS THAN OR EQUAL" => Operator::Le,
            "IN" => Operator::In,
            "NOT IN" | "NIN" | "NOTIN" => Operator::NotIn,
            "BETWEEN" => Operator::Between,
            "LIKE" => Operator::Like,
            "CONTAINS" => Operator::Contains,
            "BEGINS WITH" | "BEGINSWITH" | "STARTS WITH" | "STARTSWITH" => Operator::BeginsWith,
            "ENDS WITH" | "ENDSWITH" => Operator::EndsWith,
            "IS" => Operator::Is,
            "IS NOT" | "ISNOT" => Operator::IsNot,
            _ => return None,
        })
    }

    /// SQL keyword or symbol for the operator. The pattern operators
    /// (`CONTAINS`, `BEGINS_WITH`, `ENDS_WITH`) render as `LIKE`.
    pub fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::Like | Operator::Contains | Operator::BeginsWith | Operator::EndsWith => {
                "LIKE"
            }
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
        }
    }

    pub fn takes_list(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Evaluates `lhs <op> rhs` in memory. `rhs2` is the upper bound for
    /// `BETWEEN`.
    pub fn matches(self, lhs: &Value, rhs: &Value, rhs2: Option<&Value>) -> bool {
        let cmp = || lhs.compare(rhs);

        match self {
            Operator::Eq => cmp() == Some(Ordering::Equal),
            Operator::Ne => matches!(cmp(), Some(Ordering::Less | Ordering::Greater)),
            Operator::Gt => cmp() == Some(Ordering::Greater),
            Operator::Ge => matches!(cmp(), Some(Ordering::Greater | Ordering::Equal)),
            Operator::Lt => cmp() == Some(Ordering::Less),
            Operator::Le => matches!(cmp(), Some(Ordering::Less | Ordering::Equal)),
            Operator::In => rhs
                .as_list()
                .map(|list| list.iter().any(|item| lhs.loosely_eq(item)))
                .unwrap_or_else(|| lhs.loosely_eq(rhs)),
            Operator::NotIn => !Operator::In.matches(lhs, rhs, None),
            Operator::Between => match rhs2 {
                Some(upper) => {
                    Operator::Ge.matches(lhs, rhs, None) && Operator::Le.matches(lhs, upper, None)
                }
                None => false,
            },
            Operator::Like => match (lhs.as_str(), rhs.as_str()) {
                (Some(text), Some(pattern)) => like(text, pattern),
                _ => false,
            },
            Operator::Contains => str_op(lhs, rhs, |a, b| a.contains(b)),
            Operator::BeginsWith => str_op(lhs, rhs, |a, b| a.starts_with(b)),
            Operator::EndsWith => str_op(lhs, rhs, |a, b| a.ends_with(b)),
            Operator::Is => (lhs.is_null() && rhs.is_null()) || lhs.loosely_eq(rhs),
            Operator::IsNot => !Operator::Is.matches(lhs, rhs, None),
        }
    }
}

fn str_op(lhs: &Value, rhs: &Value, f: impl Fn(&str, &str) -> bool) -> bool {
    match (lhs.as_str(), rhs.as_str()) {
        (Some(a), Some(b)) => f(&a.to_lowercase(), &b.to_lowercase()),
        _ => false,
    }
}

/// Case-insensitive SQL `LIKE` matching with `%` and `_` wildcards.
fn like(text: &str, pattern: &str) -> bool {
    fn go(text: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some(('%', rest)) => (0..=text.len()).any(|i| go(&text[i..], rest)),
            Some(('_', rest)) => !text.is_empty() && go(&text[1..], rest),
            Some((c, rest)) => text.first() == Some(c) && go(&text[1..], rest),
        }
    }

    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    go(&text, &pattern)
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(src: &str) -> Result<Operator, Error> {
        Operator::parse(src).ok_or_else(|| Error::query(format!("unknown operator `{src}`")))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Contains => "CONTAINS",
            Operator::BeginsWith => "BEGINS_WITH",
            Operator::EndsWith => "ENDS_WITH",
            op => op.sql(),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_share_one_canonical_form() {
        for src in ["=", "==", "eq", "EQUALS", " equal "] {
            assert_eq!(Operator::parse(src), Some(Operator::Eq), "{src}");
        }
        for src in ["!=", "<>", "ne", "not_equals"] {
            assert_eq!(Operator::parse(src), Some(Operator::Ne), "{src}");
        }
        for src in ["not in", "NOT_IN", "not  in", "nin"] {
            assert_eq!(Operator::parse(src), Some(Operator::NotIn), "{src}");
        }
        for src in ["begins_with", "BEGINS WITH", "starts-with"] {
            assert_eq!(Operator::parse(src), Some(Operator::BeginsWith), "{src}");
        }
        assert_eq!(Operator::parse("is not"), Some(Operator::IsNot));
        assert_eq!(Operator::parse("gte"), Some(Operator::Ge));
        assert_eq!(Operator::parse("nope"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let all = [
            Operator::Eq,
            Operator::Ne,
            Operator::Gt,
            Operator::Ge,
            Operator::Lt,
            Operator::Le,
            Operator::In,
            Operator::NotIn,
            Operator::Between,
            Operator::Like,
            Operator::Contains,
            Operator::BeginsWith,
            Operator::EndsWith,
            Operator::Is,
            Operator::IsNot,
        ];

        for op in all {
            assert_eq!(Operator::parse(&op.to_string()), Some(op));
        }
    }

    #[test]
    fn in_memory_evaluation() {
        let list = Value::from(vec![1, 2, 3]);
        assert!(Operator::In.matches(&Value::from(2), &list, None));
        assert!(Operator::NotIn.matches(&Value::from(5), &list, None));
        assert!(Operator::Between.matches(&Value::from(5), &Value::from(1), Some(&Value::from(5))));
        assert!(Operator::Like.matches(&Value::from("Smith"), &Value::from("sm%h"), None));
        assert!(Operator::BeginsWith.matches(&Value::from("Smith"), &Value::from("SM"), None));
        assert!(Operator::Is.matches(&Value::Null, &Value::Null, None));
    }
}
