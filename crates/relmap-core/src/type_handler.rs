use crate::schema::DataType;
use crate::Value;

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Debug;

/// Converts values between their entity and storage representations.
///
/// Both methods convert `value` in place and return `false` when the value
/// cannot be converted, in which case it is left untouched.
pub trait DataTypeHandler: Debug + Send + Sync {
    fn to_persistence_value(&self, value: &mut Value, ty: Option<DataType>, format: Option<&str>)
        -> bool;

    fn to_object_value(&self, value: &mut Value, ty: Option<DataType>, format: Option<&str>)
        -> bool;
}

/// Booleans are stored as `0`/`1`, dates as formatted strings (the column
/// format, or MySQL's), and numeric columns accept numeric strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeHandler;

impl DataTypeHandler for DefaultTypeHandler {
    fn to_persistence_value(
        &self,
        value: &mut Value,
        ty: Option<DataType>,
        format: Option<&str>,
    ) -> bool {
        let converted = match (ty, &*value) {
            (_, Value::Null) => return true,
            (_, Value::Reference(reference)) => reference.key.clone(),
            (_, Value::Bool(v)) => Value::I64(*v as i64),
            (Some(ty), Value::Date(v)) => {
                Value::String(v.format(date_format(ty, format)).to_string())
            }
            (Some(ty), Value::DateTime(v)) => {
                Value::String(v.format(date_format(ty, format)).to_string())
            }
            (None, Value::Date(v)) => Value::String(v.format("%Y-%m-%d").to_string()),
            (None, Value::DateTime(v)) => {
                Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())
            }
            (Some(DataType::Int), Value::String(v)) => match v.trim().parse() {
                Ok(v) => Value::I64(v),
                Err(_) => return false,
            },
            (Some(DataType::Float), Value::String(v)) => match v.trim().parse() {
                Ok(v) => Value::F64(v),
                Err(_) => return false,
            },
            (_, Value::List(_)) => return false,
            _ => return true,
        };

        *value = converted;
        true
    }

    fn to_object_value(&self, value: &mut Value, ty: Option<DataType>, format: Option<&str>) -> bool {
        let Some(ty) = ty else {
            return true;
        };

        let converted = match (ty, &*value) {
            (_, Value::Null) => return true,
            (DataType::String, Value::String(_)) => return true,
            (DataType::String, Value::I64(v)) => Value::String(v.to_string()),
            (DataType::String, Value::F64(v)) => Value::String(v.to_string()),
            (DataType::Int, Value::I64(_)) => return true,
            (DataType::Int, Value::F64(v)) if v.fract() == 0.0 => Value::I64(*v as i64),
            (DataType::Int, Value::Bool(v)) => Value::I64(*v as i64),
            (DataType::Int, Value::String(v)) => match v.trim().parse() {
                Ok(v) => Value::I64(v),
                Err(_) => return false,
            },
            (DataType::Float, Value::F64(_)) => return true,
            (DataType::Float, Value::I64(v)) => Value::F64(*v as f64),
            (DataType::Float, Value::String(v)) => match v.trim().parse() {
                Ok(v) => Value::F64(v),
                Err(_) => return false,
            },
            (DataType::Bool, Value::Bool(_)) => return true,
            (DataType::Bool, Value::I64(v)) => Value::Bool(*v != 0),
            (DataType::Bool, Value::String(v)) => match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Value::Bool(true),
                "0" | "false" | "" => Value::Bool(false),
                _ => return false,
            },
            (DataType::Date | DataType::DateString, Value::Date(_)) => return true,
            (DataType::Date | DataType::DateString, Value::DateTime(v)) => Value::Date(v.date()),
            (DataType::Date | DataType::DateString, Value::String(v)) => {
                match NaiveDate::parse_from_str(v.trim(), date_format(ty, format)) {
                    Ok(v) => Value::Date(v),
                    Err(_) => return false,
                }
            }
            (DataType::DateTime | DataType::DateTimeString, Value::DateTime(_)) => return true,
            (DataType::DateTime | DataType::DateTimeString, Value::String(v)) => {
                match NaiveDateTime::parse_from_str(v.trim(), date_format(ty, format)) {
                    Ok(v) => Value::DateTime(v),
                    Err(_) => return false,
                }
            }
            _ => return false,
        };

        *value = converted;
        true
    }
}

/// String-formatted columns use their declared format; native date columns
/// always use the storage default.
fn date_format(ty: DataType, format: Option<&str>) -> &str {
    match ty {
        DataType::DateString | DataType::DateTimeString => {
            format.or(ty.default_format()).unwrap_or("%Y-%m-%d %H:%M:%S")
        }
        _ => ty.default_format().unwrap_or("%Y-%m-%d %H:%M:%S"),
    }
}
