//! Static descriptions of entity classes.
//!
//! A [`ClassDescriptor`] lists the properties of an entity type once, up
//! front, together with any mapping metadata declared alongside them. The
//! mapper walks these descriptors instead of inspecting types at runtime.

use crate::schema::{Column, Relationship, Table};

use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    /// Class name, unique within a registry
    pub name: String,

    /// Table metadata declared on the class
    pub table: Option<Table>,

    /// Properties in declaration order
    pub properties: Vec<PropertyDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,

    /// What the property holds
    pub kind: PropertyKind,

    /// Column metadata declared on the property
    pub column: Option<Column>,

    /// Relationship metadata declared on the property
    pub relationship: Option<Relationship>,
}

/// The declared type of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// A plain value
    Scalar,

    /// A single instance of the named class
    Object(String),

    /// A collection of instances of the named class
    Collection(String),
}

/// Class descriptors by name.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: IndexMap<String, Arc<ClassDescriptor>>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> ClassDescriptor {
        ClassDescriptor {
            name: name.into(),
            table: None,
            properties: vec![],
        }
    }

    pub fn table(mut self, table: Table) -> ClassDescriptor {
        self.table = Some(table);
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> ClassDescriptor {
        self.properties.push(property);
        self
    }

    /// Adds a scalar property mapped by `column`.
    pub fn column(self, name: impl Into<String>, column: Column) -> ClassDescriptor {
        self.property(PropertyDescriptor::scalar(name).with_column(column))
    }

    /// Adds a scalar property without metadata.
    pub fn scalar(self, name: impl Into<String>) -> ClassDescriptor {
        self.property(PropertyDescriptor::scalar(name))
    }

    /// Adds a relationship property. The declared kind follows from the
    /// relationship: collections for to-many, scalars for scalar joins.
    pub fn relationship(
        self,
        name: impl Into<String>,
        relationship: Relationship,
    ) -> ClassDescriptor {
        let child = relationship.child_class.clone().unwrap_or_default();
        let kind = if relationship.is_scalar() {
            PropertyKind::Scalar
        } else if relationship.is_to_many() {
            PropertyKind::Collection(child)
        } else {
            PropertyKind::Object(child)
        };

        self.property(PropertyDescriptor {
            name: name.into(),
            kind,
            column: None,
            relationship: Some(relationship),
        })
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|property| property.name == name)
    }
}

impl PropertyDescriptor {
    pub fn scalar(name: impl Into<String>) -> PropertyDescriptor {
        PropertyDescriptor {
            name: name.into(),
            kind: PropertyKind::Scalar,
            column: None,
            relationship: None,
        }
    }

    pub fn object(name: impl Into<String>, class: impl Into<String>) -> PropertyDescriptor {
        PropertyDescriptor {
            kind: PropertyKind::Object(class.into()),
            ..PropertyDescriptor::scalar(name)
        }
    }

    pub fn collection(name: impl Into<String>, class: impl Into<String>) -> PropertyDescriptor {
        PropertyDescriptor {
            kind: PropertyKind::Collection(class.into()),
            ..PropertyDescriptor::scalar(name)
        }
    }

    pub fn with_column(mut self, column: Column) -> PropertyDescriptor {
        self.column = Some(column);
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> PropertyDescriptor {
        self.relationship = Some(relationship);
        self
    }

    /// Class named by the declared type, if any.
    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Scalar => None,
            PropertyKind::Object(class) | PropertyKind::Collection(class) => Some(class),
        }
    }
}

impl ClassRegistry {
    pub fn new() -> ClassRegistry {
        ClassRegistry::default()
    }

    /// Registers a class, replacing any previous descriptor with that name.
    pub fn register(&mut self, class: ClassDescriptor) {
        self.classes.insert(class.name.clone(), Arc::new(class));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ClassDescriptor>> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClassDescriptor>> {
        self.classes.values()
    }
}

impl FromIterator<ClassDescriptor> for ClassRegistry {
    fn from_iter<T: IntoIterator<Item = ClassDescriptor>>(iter: T) -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        for class in iter {
            registry.register(class);
        }
        registry
    }
}
