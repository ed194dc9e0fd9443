//! Entities as the engine sees them: a class name and named fields.

use crate::Lazy;

use indexmap::IndexMap;
use relmap_core::{Error, ObjectReference, Result, Row, Value};

/// The content of one property of an [`Object`].
#[derive(Debug, Clone)]
pub enum Field {
    /// A scalar value. On a to-one relationship this is the raw key of the
    /// related entity.
    Value(Value),

    /// A to-one child; `None` when there is none
    Object(Option<Object>),

    /// A to-many child collection
    Collection(Vec<Object>),

    /// A relationship loaded on first access
    Lazy(Box<Lazy<Field>>),
}

/// An entity instance.
///
/// Objects remember the stored values they were loaded with, so saving an
/// object only writes the properties that changed. An object that was
/// never loaded or saved is new and is inserted when saved.
#[derive(Debug, Clone)]
pub struct Object {
    class: String,
    fields: IndexMap<String, Field>,

    /// Stored values as of the last load or save; `None` for new objects
    snapshot: Option<IndexMap<String, Value>>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Object {
        Object {
            class: class.into(),
            fields: IndexMap::new(),
            snapshot: None,
        }
    }

    /// An unbound result row, one field per column alias.
    pub fn from_row(class: impl Into<String>, row: Row) -> Object {
        let mut object = Object::new(class);
        for (alias, value) in row {
            object.fields.insert(alias, Field::Value(value));
        }
        object.mark_clean();
        object
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The scalar value of `name`. Missing properties and properties that
    /// hold objects read as null.
    pub fn value(&self, name: &str) -> Value {
        match self.fields.get(name) {
            Some(Field::Value(value)) => value.clone(),
            _ => Value::Null,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Object {
        self.fields.insert(name.into(), Field::Value(value.into()));
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Object {
        self.set(name, value);
        self
    }

    pub fn set_object(&mut self, name: impl Into<String>, object: Option<Object>) -> &mut Object {
        self.fields.insert(name.into(), Field::Object(object));
        self
    }

    pub fn with_object(mut self, name: impl Into<String>, object: Object) -> Object {
        self.set_object(name, Some(object));
        self
    }

    pub fn set_collection(&mut self, name: impl Into<String>, objects: Vec<Object>) -> &mut Object {
        self.fields.insert(name.into(), Field::Collection(objects));
        self
    }

    pub fn with_collection(mut self, name: impl Into<String>, objects: Vec<Object>) -> Object {
        self.set_collection(name, objects);
        self
    }

    pub(crate) fn set_lazy(&mut self, name: impl Into<String>, lazy: Lazy<Field>) {
        self.fields.insert(name.into(), Field::Lazy(Box::new(lazy)));
    }

    /// Whether `name` is present and, if lazy, already loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        match self.fields.get(name) {
            Some(Field::Lazy(lazy)) => lazy.is_loaded(),
            Some(_) => true,
            None => false,
        }
    }

    /// The to-one child at `name`, loading it first if needed.
    pub fn object(&self, name: &str) -> Result<Option<&Object>> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(field) => match resolve(field)? {
                Field::Object(object) => Ok(object.as_ref()),
                Field::Value(Value::Null) => Ok(None),
                _ => Err(not_a(&self.class, name, "to-one relationship")),
            },
        }
    }

    pub fn object_mut(&mut self, name: &str) -> Result<Option<&mut Object>> {
        let class = self.class.clone();
        match self.fields.get_mut(name) {
            None => Ok(None),
            Some(field) => match resolve_mut(field)? {
                Field::Object(object) => Ok(object.as_mut()),
                Field::Value(Value::Null) => Ok(None),
                _ => Err(not_a(&class, name, "to-one relationship")),
            },
        }
    }

    /// The children at `name`, loading them first if needed.
    pub fn collection(&self, name: &str) -> Result<&[Object]> {
        match self.fields.get(name) {
            None => Ok(&[]),
            Some(field) => match resolve(field)? {
                Field::Collection(objects) => Ok(objects),
                _ => Err(not_a(&self.class, name, "collection")),
            },
        }
    }

    /// Mutable children at `name`. An absent collection is created empty.
    pub fn collection_mut(&mut self, name: &str) -> Result<&mut Vec<Object>> {
        let class = self.class.clone();
        let field = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| Field::Collection(vec![]));

        match resolve_mut(field)? {
            Field::Collection(objects) => Ok(objects),
            _ => Err(not_a(&class, name, "collection")),
        }
    }

    /// A reference to this object by the value of its `key` property.
    pub fn reference(&self, key: &str) -> ObjectReference {
        ObjectReference::new(&self.class, self.value(key))
    }

    /// Never loaded from or saved to storage.
    pub fn is_new(&self) -> bool {
        self.snapshot.is_none()
    }

    /// Whether the scalar at `name` differs from its stored value. Every
    /// property of a new object is dirty.
    pub fn is_dirty(&self, name: &str) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return true;
        };

        match self.fields.get(name) {
            Some(Field::Value(value)) => match snapshot.get(name) {
                Some(stored) => stored != value,
                None => !value.is_null(),
            },
            _ => false,
        }
    }

    /// The stored value of `name` as of the last load or save.
    pub fn stored(&self, name: &str) -> Option<&Value> {
        self.snapshot.as_ref().and_then(|snapshot| snapshot.get(name))
    }

    /// Records the stored value of a property that does not hold a scalar,
    /// such as the foreign key behind a to-one relationship.
    pub(crate) fn remember(&mut self, name: &str, value: Value) {
        self.snapshot
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), value);
    }

    /// Takes the current scalars as the stored state.
    pub(crate) fn mark_clean(&mut self) {
        let mut snapshot = self.snapshot.take().unwrap_or_default();
        for (name, field) in &self.fields {
            if let Field::Value(value) = field {
                snapshot.insert(name.clone(), value.clone());
            }
        }
        self.snapshot = Some(snapshot);
    }
}

fn resolve(field: &Field) -> Result<&Field> {
    match field {
        Field::Lazy(lazy) => lazy.get(),
        field => Ok(field),
    }
}

fn resolve_mut(field: &mut Field) -> Result<&mut Field> {
    match field {
        Field::Lazy(lazy) => lazy.get_mut(),
        field => Ok(field),
    }
}

fn not_a(class: &str, name: &str, what: &str) -> Error {
    Error::query(format!("`{class}.{name}` is not a {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_objects_are_dirty() {
        let object = Object::new("Member").with("name", "Ann");
        assert!(object.is_new());
        assert!(object.is_dirty("name"));
        assert!(object.is_dirty("missing"));
    }

    #[test]
    fn only_changed_scalars_are_dirty() {
        let mut object = Object::new("Member").with("name", "Ann").with("age", 30);
        object.mark_clean();
        assert!(!object.is_dirty("name"));

        object.set("age", 31);
        object.set("nickname", Value::Null);
        assert!(object.is_dirty("age"));
        assert!(!object.is_dirty("name"));
        assert!(!object.is_dirty("nickname"));
        assert_eq!(object.stored("age"), Some(&Value::from(30)));
    }

    #[test]
    fn lazy_fields_resolve_on_access() {
        let mut object = Object::new("Contact");
        object.set_lazy(
            "policies",
            Lazy::new(|| Ok(Field::Collection(vec![Object::new("Policy")]))),
        );

        assert!(!object.is_loaded("policies"));
        assert_eq!(object.collection("policies").unwrap().len(), 1);
        assert!(object.is_loaded("policies"));

        object.collection_mut("policies").unwrap().clear();
        assert!(object.collection("policies").unwrap().is_empty());
    }

    #[test]
    fn lazy_children_can_hold_lazy_fields() {
        let mut contact = Object::new("Contact");
        contact.set_lazy(
            "policies",
            Lazy::new(|| {
                let mut policy = Object::new("Policy");
                policy.set_lazy("contact", Lazy::new(|| Ok(Field::Object(None))));
                Ok(Field::Collection(vec![policy]))
            }),
        );

        let policies = contact.collection("policies").unwrap();
        assert!(!policies[0].is_loaded("contact"));
        assert!(policies[0].object("contact").unwrap().is_none());
    }

    #[test]
    fn scalars_are_not_collections() {
        let object = Object::new("Member").with("name", "Ann");
        assert!(object.collection("name").unwrap_err().is_query());
    }
}
