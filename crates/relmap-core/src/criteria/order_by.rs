use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One ORDER BY entry on a property path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub property: String,
    pub direction: Direction,
}

impl Direction {
    /// Recognizes the two sort keywords, case-insensitively.
    pub fn parse(token: &str) -> Option<Direction> {
        match token.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Direction::Asc),
            "DESC" => Some(Direction::Desc),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

impl OrderBy {
    pub fn asc(property: impl Into<String>) -> OrderBy {
        OrderBy {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> OrderBy {
        OrderBy {
            property: property.into(),
            direction: Direction::Desc,
        }
    }

    /// Parses `"path"` or `"path DESC"`. A trailing token that is not a sort
    /// keyword is part of the property and the direction defaults to
    /// ascending.
    pub fn parse(src: &str) -> OrderBy {
        let src = src.trim();

        if let Some((property, token)) = src.rsplit_once(char::is_whitespace) {
            if let Some(direction) = Direction::parse(token) {
                return OrderBy {
                    property: property.trim().to_string(),
                    direction,
                };
            }
        }

        OrderBy::asc(src)
    }
}

/// Normalizes an ORDER BY specification.
///
/// Accepts a comma separated string (`"lastName DESC, id"`), a list of such
/// entries, or a map of `path => direction`. A map value that is not a sort
/// keyword leaves the key to be parsed as a plain entry, ascending unless
/// the key itself ends in a sort keyword.
pub fn normalize_order_by(raw: &serde_json::Value) -> Result<Vec<OrderBy>> {
    match raw {
        serde_json::Value::Null => Ok(vec![]),
        serde_json::Value::String(src) => Ok(src
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .map(OrderBy::parse)
            .collect()),
        serde_json::Value::Array(items) => {
            let mut order_by = vec![];
            for item in items {
                order_by.extend(normalize_order_by(item)?);
            }
            Ok(order_by)
        }
        serde_json::Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| {
                match value.as_str().and_then(Direction::parse) {
                    Some(direction) => OrderBy {
                        property: key.trim().to_string(),
                        direction,
                    },
                    None => OrderBy::parse(key),
                }
            })
            .collect()),
        other => Err(Error::query(format!(
            "cannot order by `{other}`; expected a property path"
        ))),
    }
}
