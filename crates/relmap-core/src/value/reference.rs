use super::Value;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stand-in for an entity that is only known by its key.
///
/// Used where an entity appears as a value: in criteria, and as the target of
/// a foreign key before (or instead of) loading the entity itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectReference {
    /// Class of the referenced entity
    pub class: String,

    /// Primary key value of the referenced entity. Composite keys are held
    /// as a `Value::List` in primary key order.
    pub key: Value,
}

impl ObjectReference {
    pub fn new(class: impl Into<String>, key: impl Into<Value>) -> ObjectReference {
        ObjectReference {
            class: class.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.key)
    }
}
