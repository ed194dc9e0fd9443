use crate::fetcher::{column_property, Lookup};
use crate::{Db, Field, Lazy, Object};

use indexmap::IndexMap;
use relmap_core::{Error, MappingCollection, PropertyMapping, Result, Row, Value};
use tracing::trace;

/// Builds object graphs from flat result rows.
///
/// Each row holds the root entity and every joined child under the aliases
/// of the mapping collection. Rows repeating a root entity, which happens
/// when a to-many relationship is joined, are folded into one object whose
/// collection gathers the children, unless duplicates are allowed.
/// Relationships that were not joined become [`Lazy`] fields that query the
/// storage on first access.
#[derive(Debug)]
pub struct ObjectBinder<'a> {
    db: &'a Db,
    collection: &'a MappingCollection,
    allow_duplicates: bool,
}

impl<'a> ObjectBinder<'a> {
    pub fn new(db: &'a Db, collection: &'a MappingCollection) -> ObjectBinder<'a> {
        ObjectBinder {
            db,
            collection,
            allow_duplicates: db.config().allow_duplicates(),
        }
    }

    /// Returns one object per row instead of folding rows by key.
    pub fn allow_duplicates(mut self, allow: bool) -> ObjectBinder<'a> {
        self.allow_duplicates = allow;
        self
    }

    pub fn bind(&self, rows: &[Row]) -> Result<Vec<Object>> {
        let mut objects: Vec<Object> = vec![];
        let mut seen: IndexMap<String, usize> = IndexMap::new();

        for row in rows {
            let key = self.key(row, &[]);

            if !self.allow_duplicates {
                if let Some(index) = key.as_ref().and_then(|key| seen.get(key)) {
                    self.merge(&mut objects[*index], row, &[])?;
                    continue;
                }
            }

            let object = self.hydrate(row, &[])?;
            if let Some(key) = key {
                seen.entry(key).or_insert(objects.len());
            }
            objects.push(object);
        }

        trace!(
            class = self.collection.class_name(),
            rows = rows.len(),
            objects = objects.len(),
            "bound rows"
        );
        Ok(objects)
    }

    fn hydrate(&self, row: &Row, parents: &[String]) -> Result<Object> {
        let class = self.collection.class_at(parents).ok_or_else(|| {
            Error::mapping(
                self.collection.class_name(),
                None,
                format!("no class is mapped at `{}`", parents.join(".")),
            )
        })?;

        let mut object = Object::new(class);
        for mapping in self.collection.properties_at(parents) {
            if mapping.is_relationship() {
                self.bind_relationship(&mut object, mapping, row)?;
            } else if mapping.column.is_some() {
                object.set(mapping.property_name.as_str(), self.column_value(mapping, row));
            }
        }

        object.mark_clean();
        Ok(object)
    }

    /// Adds what `row` contributes to an object hydrated from an earlier
    /// row: children of joined to-many relationships not seen yet.
    fn merge(&self, object: &mut Object, row: &Row, parents: &[String]) -> Result<()> {
        for mapping in self.collection.properties_at(parents) {
            if !mapping.is_relationship() || !mapping.is_expanded() {
                continue;
            }

            let child_parents = mapping.child_parents();
            match object.get_mut(&mapping.property_name) {
                Some(Field::Collection(children)) => {
                    if !self.is_present(row, &child_parents) {
                        continue;
                    }

                    let key = self.key(row, &child_parents);
                    let existing = key.as_ref().and_then(|key| {
                        children
                            .iter()
                            .position(|child| self.object_key(child, &child_parents).as_ref() == Some(key))
                    });

                    match existing {
                        Some(index) => self.merge(&mut children[index], row, &child_parents)?,
                        None => children.push(self.hydrate(row, &child_parents)?),
                    }
                }
                Some(Field::Object(Some(child))) => self.merge(child, row, &child_parents)?,
                _ => {}
            }
        }

        Ok(())
    }

    fn bind_relationship(
        &self,
        object: &mut Object,
        mapping: &PropertyMapping,
        row: &Row,
    ) -> Result<()> {
        let name = mapping.property_name.as_str();
        let Some(relationship) = &mapping.relationship else {
            return Ok(());
        };

        if mapping.is_expanded() {
            let child_parents = mapping.child_parents();
            let child = if self.is_present(row, &child_parents) {
                Some(self.hydrate(row, &child_parents)?)
            } else {
                None
            };

            if mapping.is_to_many() {
                object.set_collection(name, child.into_iter().collect());
            } else {
                if mapping.is_owning_side() {
                    let key = relationship
                        .target_join_column
                        .as_deref()
                        .and_then(|column| column_property(self.collection, &child_parents, column))
                        .map(|key| raw_value(row, key))
                        .unwrap_or_default();
                    object.remember(name, key);
                }
                object.set_object(name, child);
            }
            return Ok(());
        }

        let Some(class) = mapping.child_class() else {
            return Ok(());
        };

        let lookup = if mapping.is_owning_side() {
            // The foreign key is selected under the property's alias
            let key = raw_value(row, mapping);
            object.remember(name, key.clone());
            Lookup::Column {
                column: relationship
                    .target_join_column
                    .clone()
                    .unwrap_or_else(|| "id".to_string()),
                value: key,
            }
        } else if mapping.is_many_to_many() {
            let (Some(table), Some(source), Some(target), Some(resolved)) = (
                &relationship.join_table,
                &relationship.source_join_column,
                &relationship.target_join_column,
                &mapping.target,
            ) else {
                return Err(Error::mapping(
                    &mapping.class_name,
                    Some(name),
                    "many-to-many relationship not resolved",
                ));
            };

            Lookup::Linked {
                table: table.clone(),
                source: source.clone(),
                target: target.clone(),
                child_key: resolved.child_key.clone().unwrap_or_else(|| "id".to_string()),
                value: self.owner_value(row, mapping, &resolved.owner_key),
            }
        } else if let Some(mapped_by) = &relationship.mapped_by {
            let owner_key = relationship.source_join_column.as_deref().unwrap_or("id");
            Lookup::Property {
                property: mapped_by.clone(),
                value: self.owner_value(row, mapping, owner_key),
            }
        } else {
            return Ok(());
        };

        let to_many = mapping.is_to_many();
        if lookup.value().is_null() {
            if to_many {
                object.set_collection(name, vec![]);
            } else {
                object.set_object(name, None);
            }
            return Ok(());
        }

        let db = self.db.clone();
        let class = class.to_string();
        let order_by = relationship.order_by.clone().unwrap_or_default();
        object.set_lazy(
            name,
            Lazy::new(move || lookup.load(&db, &class, to_many, &order_by)),
        );

        Ok(())
    }

    /// A column value as the object holds it: translated through the data
    /// map, then converted by the type handler. A value the handler cannot
    /// convert is kept as stored.
    fn column_value(&self, mapping: &PropertyMapping, row: &Row) -> Value {
        let mut value = raw_value(row, mapping);

        if let Some(data_map) = mapping.column.as_ref().and_then(|column| column.data_map.as_ref()) {
            if !mapping.is_scalar_join() || data_map.is_reversible() {
                value = data_map.translate(&value);
            }
        }

        let mut converted = value.clone();
        if self
            .db
            .handler()
            .to_object_value(&mut converted, mapping.data_type(), mapping.format())
        {
            converted
        } else {
            trace!(alias = %mapping.alias, "value left unconverted");
            value
        }
    }

    /// The owning object's value for `column`, read from the same row.
    fn owner_value(&self, row: &Row, mapping: &PropertyMapping, column: &str) -> Value {
        column_property(self.collection, &mapping.parents, column)
            .map(|owner| raw_value(row, owner))
            .unwrap_or_default()
    }

    /// Identity of the object at `parents` within `row`; `None` when it has
    /// no primary key or the key is null.
    fn key(&self, row: &Row, parents: &[String]) -> Option<String> {
        let values: Vec<Value> = self
            .collection
            .primary_keys_at(parents)
            .map(|mapping| self.column_value(mapping, row))
            .collect();
        identity(values)
    }

    fn object_key(&self, object: &Object, parents: &[String]) -> Option<String> {
        let values: Vec<Value> = self
            .collection
            .primary_keys_at(parents)
            .map(|mapping| object.value(&mapping.property_name))
            .collect();
        identity(values)
    }

    /// An outer join that matched no child leaves every child column null.
    fn is_present(&self, row: &Row, parents: &[String]) -> bool {
        let keys: Vec<&PropertyMapping> = self.collection.primary_keys_at(parents).collect();
        if !keys.is_empty() {
            return keys.iter().any(|mapping| !raw_value(row, mapping).is_null());
        }

        self.collection
            .properties_at(parents)
            .filter(|mapping| mapping.is_column())
            .any(|mapping| !raw_value(row, mapping).is_null())
    }
}

fn raw_value(row: &Row, mapping: &PropertyMapping) -> Value {
    row.get(&mapping.alias).cloned().unwrap_or_default()
}

fn identity(values: Vec<Value>) -> Option<String> {
    if values.is_empty() || values.iter().all(Value::is_null) {
        return None;
    }
    Some(Value::List(values).hash_key())
}
