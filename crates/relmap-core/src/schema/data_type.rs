use serde::{Deserialize, Serialize};

/// The storage data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Int,
    Float,
    Bool,
    Date,
    DateTime,

    /// A date held as a formatted string on the entity
    DateString,

    /// A date and time held as a formatted string on the entity
    DateTimeString,
}

impl DataType {
    /// Parses a data type tag. Tags are case-insensitive and accept the
    /// common aliases (`integer`, `boolean`, `decimal`, ...).
    pub fn parse(tag: &str) -> Option<DataType> {
        Some(match tag.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" | "varchar" => DataType::String,
            "int" | "integer" | "bigint" | "smallint" => DataType::Int,
            "float" | "double" | "decimal" | "numeric" => DataType::Float,
            "bool" | "boolean" => DataType::Bool,
            "date" => DataType::Date,
            "datetime" | "datetime_immutable" | "timestamp" => DataType::DateTime,
            "date_string" | "datestring" => DataType::DateString,
            "datetime_string" | "datetimestring" => DataType::DateTimeString,
            _ => return None,
        })
    }

    pub fn is_date(self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::DateTime | DataType::DateString | DataType::DateTimeString
        )
    }

    /// The format used when the column does not declare one.
    pub fn default_format(self) -> Option<&'static str> {
        match self {
            DataType::Date | DataType::DateString => Some("%Y-%m-%d"),
            DataType::DateTime | DataType::DateTimeString => Some("%Y-%m-%d %H:%M:%S"),
            _ => None,
        }
    }
}
