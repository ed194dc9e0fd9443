mod reference;
pub use reference::ObjectReference;

use crate::{Error, Result};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

/// A scalar value as it travels between entities, criteria, SQL parameters
/// and result rows.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 64-bit integer
    I64(i64),

    /// 64-bit float
    F64(f64),

    /// String value
    String(String),

    /// Calendar date without a time
    Date(NaiveDate),

    /// Date and time without a timezone
    DateTime(NaiveDateTime),

    /// A list of values, used for `IN` lists and composite keys
    List(Vec<Value>),

    /// A reference to another entity, reduced to its key when persisted
    Reference(Box<ObjectReference>),
}

impl Value {
    pub const fn null() -> Value {
        Value::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            Value::Bool(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::I64(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_i64(&self) -> Result<i64> {
        match self {
            Value::I64(v) => Ok(*v),
            Value::String(v) => v
                .trim()
                .parse()
                .map_err(|_| Error::type_conversion(self.clone(), "i64")),
            _ => Err(Error::type_conversion(self.clone(), "i64")),
        }
    }

    pub fn to_string_value(&self) -> Result<String> {
        match self {
            Value::String(v) => Ok(v.clone()),
            Value::I64(v) => Ok(v.to_string()),
            Value::F64(v) => Ok(v.to_string()),
            _ => Err(Error::type_conversion(self.clone(), "String")),
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::I64(_) => "I64",
            Value::F64(_) => "F64",
            Value::String(_) => "String",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::List(_) => "List",
            Value::Reference(_) => "Reference",
        }
    }

    /// Reduces entity references to the key value they hold. Other values
    /// are returned unchanged.
    pub fn into_key_value(self) -> Value {
        match self {
            Value::Reference(reference) => reference.key,
            Value::List(items) => {
                Value::List(items.into_iter().map(Value::into_key_value).collect())
            }
            value => value,
        }
    }

    /// A string uniquely identifying this value, used to group rows by key.
    pub fn hash_key(&self) -> String {
        match self {
            Value::Null => "n".to_string(),
            Value::Bool(v) => format!("b:{v}"),
            Value::I64(v) => format!("i:{v}"),
            Value::F64(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                format!("i:{}", *v as i64)
            }
            Value::F64(v) => format!("f:{v}"),
            Value::String(v) => format!("s:{v}"),
            Value::Date(v) => format!("d:{v}"),
            Value::DateTime(v) => format!("t:{v}"),
            Value::List(items) => {
                let keys: Vec<_> = items.iter().map(Value::hash_key).collect();
                format!("l:[{}]", keys.join(","))
            }
            Value::Reference(reference) => reference.key.hash_key(),
        }
    }

    /// Compares two values loosely: integers and floats compare numerically,
    /// numeric strings compare against numbers. Returns `None` for values
    /// that have no meaningful order.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;

        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) | (_, Null) => None,
            (Bool(a), Bool(b)) => a.partial_cmp(b),
            (I64(a), I64(b)) => a.partial_cmp(b),
            (I64(a), F64(b)) => (*a as f64).partial_cmp(b),
            (F64(a), I64(b)) => a.partial_cmp(&(*b as f64)),
            (F64(a), F64(b)) => a.partial_cmp(b),
            (String(a), String(b)) => a.partial_cmp(b),
            (String(a), b @ (I64(_) | F64(_) | Bool(_))) => {
                let a: f64 = a.trim().parse().ok()?;
                F64(a).compare(b)
            }
            (a @ (I64(_) | F64(_) | Bool(_)), String(b)) => {
                let b: f64 = b.trim().parse().ok()?;
                a.compare(&F64(b))
            }
            (Bool(a), b @ (I64(_) | F64(_))) => I64(*a as i64).compare(b),
            (a @ (I64(_) | F64(_)), Bool(b)) => a.compare(&I64(*b as i64)),
            (Date(a), Date(b)) => a.partial_cmp(b),
            (DateTime(a), DateTime(b)) => a.partial_cmp(b),
            (Reference(a), b) => a.key.compare(b),
            (a, Reference(b)) => a.compare(&b.key),
            _ => None,
        }
    }

    /// Loose equality as used by criteria evaluation and data maps.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Converts a JSON value into a `Value`. JSON objects cannot be
    /// represented and are rejected.
    pub fn from_json(json: &serde_json::Value) -> Result<Value> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(*v),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Value::I64(v),
                None => Value::F64(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(v) => Value::String(v.clone()),
            serde_json::Value::Array(items) => Value::List(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(_) => {
                return Err(Error::query(format!(
                    "cannot use a key-value structure as a scalar value: {json}"
                )))
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Reference(reference) => write!(f, "{reference}"),
        }
    }
}

/// Unit stands in for SQL `NULL`.
impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Value {
        Value::Bool(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Value {
        Value::I64(src as i64)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Value {
        Value::I64(src)
    }
}

impl From<u32> for Value {
    fn from(src: u32) -> Value {
        Value::I64(src as i64)
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Value {
        Value::F64(src)
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Value {
        Value::String(src.to_string())
    }
}

impl From<String> for Value {
    fn from(src: String) -> Value {
        Value::String(src)
    }
}

impl From<NaiveDate> for Value {
    fn from(src: NaiveDate) -> Value {
        Value::Date(src)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(src: NaiveDateTime) -> Value {
        Value::DateTime(src)
    }
}

impl From<ObjectReference> for Value {
    fn from(src: ObjectReference) -> Value {
        Value::Reference(Box::new(src))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(src: Vec<T>) -> Value {
        Value::List(src.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(src: Option<T>) -> Value {
        match src {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}
