use crate::fetcher::{column_property, linked_keys, Lookup, ObjectFetcher};
use crate::remover::ObjectRemover;
use crate::{Db, Field, Object};

use relmap_core::{
    schema::Relationship, CriteriaExpression, DeleteOptions, Error, FindOptions,
    MappingCollection, PropertyMapping, Result, SaveOptions, Value,
};
use relmap_sql::{DeleteQueryBuilder, InsertQueryBuilder, UpdateQueryBuilder};
use tracing::debug;

/// Writes object graphs back to storage.
///
/// Rows are written so that foreign keys always point at existing rows:
/// children on the owning side of a to-one relationship are saved first and
/// their generated keys fill the parent's foreign key columns, then the
/// object's own row, then the children that point back at it and the join
/// rows of many-to-many relationships. Existing objects only write the
/// properties that changed since they were loaded.
pub(crate) struct ObjectPersister<'a> {
    db: &'a Db,
    options: &'a SaveOptions,
}

/// What saving one object's own row involves.
#[derive(Default)]
struct Changes {
    /// Column assignments of the row
    columns: Vec<(String, Value)>,

    /// Foreign keys recorded once the row is written
    keys: Vec<(String, Value)>,

    /// Children detached from to-one relationships, removed after the row
    orphans: Vec<(String, Lookup)>,
}

impl<'a> ObjectPersister<'a> {
    pub(crate) fn new(db: &'a Db, options: &'a SaveOptions) -> ObjectPersister<'a> {
        ObjectPersister { db, options }
    }

    pub(crate) fn save(&self, object: &mut Object) -> Result<()> {
        self.db.transaction(|| {
            let collection = self.db.collection(object.class())?;
            self.save_object(object, &collection, None)
        })
    }

    fn save_children(&self) -> bool {
        self.options
            .save_children
            .unwrap_or_else(|| self.db.config().save_children_by_default())
    }

    fn delete_relationships(&self) -> bool {
        self.options
            .delete_relationships
            .unwrap_or_else(|| !self.db.config().disable_delete_relationships())
    }

    fn delete_entities(&self) -> bool {
        self.options
            .delete_entities
            .unwrap_or_else(|| !self.db.config().disable_delete_entities())
    }

    /// Saves `object`. When saved as the child of an inverse relationship,
    /// `back_reference` names the property pointing at the parent and the
    /// parent's key.
    fn save_object(
        &self,
        object: &mut Object,
        collection: &MappingCollection,
        back_reference: Option<(&str, &Value)>,
    ) -> Result<()> {
        let is_new = object.is_new();
        let mut changes = Changes::default();

        for mapping in collection.properties_at(&[]) {
            if mapping.is_owning_side() {
                self.foreign_key(object, mapping, back_reference, is_new, &mut changes)?;
            } else if mapping.is_embedded() {
                self.embedded(object, mapping, collection, is_new, &mut changes)?;
            } else if mapping.is_column() && !mapping.is_scalar_join() {
                self.column(object, mapping, is_new, &mut changes)?;
            }
        }

        self.write_row(object, collection, is_new, changes.columns)?;

        for (name, key) in changes.keys {
            object.remember(&name, key);
        }
        for (class, lookup) in &changes.orphans {
            self.remove_all(class, lookup)?;
        }

        for mapping in collection.properties_at(&[]) {
            if mapping.is_scalar_join() {
                if !mapping.is_read_only() {
                    self.scalar_join(object, mapping, collection, is_new)?;
                }
            } else if mapping.is_many_to_many() {
                self.links(object, mapping, collection, is_new)?;
            } else if mapping.is_embedded() {
                if let Some(Field::Object(Some(child))) = object.get_mut(&mapping.property_name) {
                    child.mark_clean();
                }
            } else if mapping.is_relationship() && !mapping.is_owning_side() {
                self.inverse_children(object, mapping, collection, is_new)?;
            }
        }

        object.mark_clean();
        Ok(())
    }

    /// Resolves the foreign key of an owning to-one relationship, saving the
    /// child first when it is attached as an object.
    fn foreign_key(
        &self,
        object: &mut Object,
        mapping: &PropertyMapping,
        back_reference: Option<(&str, &Value)>,
        is_new: bool,
        changes: &mut Changes,
    ) -> Result<()> {
        let (Some(column), Some(relationship)) =
            (mapping.foreign_key_column(), &mapping.relationship)
        else {
            return Ok(());
        };
        let name = mapping.property_name.as_str();

        let key = match back_reference {
            Some((property, owner)) if property == name => owner.clone(),
            _ => match object.get_mut(name) {
                None => return Ok(()),
                Some(Field::Lazy(lazy)) => match lazy.peek_mut() {
                    // Never accessed, so never changed
                    None => return Ok(()),
                    Some(field) => self.child_key(field, mapping, relationship)?,
                },
                Some(field) => self.child_key(field, mapping, relationship)?,
            },
        };

        let stored = object.stored(name).cloned().unwrap_or_default();
        if !is_new && stored == key {
            return Ok(());
        }

        if !stored.is_null() && relationship.is_orphan_removal() && self.delete_entities() {
            if let Some(class) = mapping.child_class() {
                changes.orphans.push((
                    class.to_string(),
                    Lookup::Column {
                        column: target_column(relationship).to_string(),
                        value: stored,
                    },
                ));
            }
        }

        changes.columns.push((column.to_string(), key.clone()));
        changes.keys.push((name.to_string(), key));
        Ok(())
    }

    fn child_key(
        &self,
        field: &mut Field,
        mapping: &PropertyMapping,
        relationship: &Relationship,
    ) -> Result<Value> {
        match field {
            Field::Value(value) => Ok(value.clone().into_key_value()),
            Field::Object(None) => Ok(Value::Null),
            Field::Object(Some(child)) => {
                let child_collection = self.db.collection(child.class())?;
                if self.save_children() {
                    self.save_object(child, &child_collection, None)?;
                }

                Ok(column_property(&child_collection, &[], target_column(relationship))
                    .map(|key| child.value(&key.property_name))
                    .unwrap_or_default())
            }
            Field::Collection(_) | Field::Lazy(_) => Err(Error::query(format!(
                "`{}.{}` must hold a single object",
                mapping.class_name, mapping.property_name
            ))),
        }
    }

    fn column(
        &self,
        object: &Object,
        mapping: &PropertyMapping,
        is_new: bool,
        changes: &mut Changes,
    ) -> Result<()> {
        if mapping.is_read_only() || mapping.is_aggregate() {
            return Ok(());
        }

        let (Some(column), name) = (mapping.short_column_name(), mapping.property_name.as_str())
        else {
            return Ok(());
        };

        if !object.contains(name) || (!is_new && !object.is_dirty(name)) {
            return Ok(());
        }

        let value = object.value(name);
        if is_new && value.is_null() && mapping.is_auto_increment() {
            return Ok(());
        }

        changes
            .columns
            .push((column.to_string(), self.persistence_value(mapping, value)?));
        Ok(())
    }

    /// Columns of an embedded child are part of the parent's row.
    fn embedded(
        &self,
        object: &Object,
        mapping: &PropertyMapping,
        collection: &MappingCollection,
        is_new: bool,
        changes: &mut Changes,
    ) -> Result<()> {
        let Some(Field::Object(Some(child))) = object.get(&mapping.property_name) else {
            return Ok(());
        };

        let is_new = is_new || child.is_new();
        let parents = mapping.child_parents();
        for child_mapping in collection.properties_at(&parents) {
            if child_mapping.is_column() && !child_mapping.is_scalar_join() {
                self.column(child, child_mapping, is_new, changes)?;
            }
        }
        Ok(())
    }

    fn write_row(
        &self,
        object: &mut Object,
        collection: &MappingCollection,
        is_new: bool,
        columns: Vec<(String, Value)>,
    ) -> Result<()> {
        let table = collection.table_name();

        if is_new {
            let insert = columns.into_iter().fold(
                InsertQueryBuilder::new(table).replace(self.options.replace),
                |insert, (column, value)| insert.set(column, value),
            );
            let id = self.db.insert(&insert.build())?;

            for key in collection.primary_keys() {
                if key.is_auto_increment() && object.value(&key.property_name).is_null() && !id.is_null() {
                    debug!(class = object.class(), %id, "assigned generated key");
                    object.set(key.property_name.as_str(), id.clone());
                }
            }
            return Ok(());
        }

        if columns.is_empty() {
            return Ok(());
        }

        let mut update = columns.into_iter().fold(
            UpdateQueryBuilder::new(table),
            |update, (column, value)| update.set(column, value),
        );
        for key in collection.primary_keys() {
            let Some(column) = key.short_column_name() else {
                continue;
            };
            let value = object
                .stored(&key.property_name)
                .cloned()
                .unwrap_or_else(|| object.value(&key.property_name));
            update = update.key(column, self.persistence_value(key, value)?);
        }

        match update.build() {
            Some(statement) => self.db.execute(&statement),
            None => Err(Error::query(format!(
                "cannot update {} without a primary key value",
                object.class()
            ))),
        }
    }

    /// A writable scalar join stores its value in the lookup table, keyed by
    /// the owner's join column.
    fn scalar_join(
        &self,
        object: &Object,
        mapping: &PropertyMapping,
        collection: &MappingCollection,
        is_new: bool,
    ) -> Result<()> {
        let name = mapping.property_name.as_str();
        if !object.contains(name) || (!is_new && !object.is_dirty(name)) {
            return Ok(());
        }

        let (Some(relationship), Some(column), Some(target)) =
            (&mapping.relationship, mapping.short_column_name(), &mapping.target)
        else {
            return Ok(());
        };
        let (Some(source), Some(target_column)) = (
            relationship.source_join_column.as_deref(),
            relationship.target_join_column.as_deref(),
        ) else {
            return Ok(());
        };

        let owner = owner_value(object, collection, source);
        if owner.is_null() {
            debug!(property = name, "scalar join not saved; owner column is null");
            return Ok(());
        }

        let statement = InsertQueryBuilder::new(target.table.as_str())
            .set(target_column, owner)
            .set(column, self.persistence_value(mapping, object.value(name))?)
            .replace(true)
            .build();
        self.db.execute(&statement)
    }

    /// Saves the children of a relationship whose foreign key lives on the
    /// child, then handles the children no longer attached.
    fn inverse_children(
        &self,
        object: &mut Object,
        mapping: &PropertyMapping,
        collection: &MappingCollection,
        is_new: bool,
    ) -> Result<()> {
        let (Some(relationship), Some(class)) = (&mapping.relationship, mapping.child_class()) else {
            return Ok(());
        };
        let Some(mapped_by) = relationship.mapped_by.as_deref() else {
            return Ok(());
        };

        let owner = owner_value(
            object,
            collection,
            relationship.source_join_column.as_deref().unwrap_or("id"),
        );
        if owner.is_null() {
            return Ok(());
        }

        let child_collection = self.db.collection(class)?;
        let key_property = child_collection.primary_key_property().to_string();
        let save_children = self.save_children();

        let children: Vec<&mut Object> = match loaded_mut(object, &mapping.property_name) {
            Some(Field::Collection(children)) => children.iter_mut().collect(),
            Some(Field::Object(Some(child))) => vec![child],
            Some(Field::Object(None)) => vec![],
            _ => return Ok(()),
        };

        let mut kept = vec![];
        for child in children {
            if save_children {
                self.save_object(child, &child_collection, Some((mapped_by, &owner)))?;
            }
            let key = child.value(&key_property);
            if !key.is_null() {
                kept.push(key);
            }
        }

        if !is_new {
            self.detach(relationship, &child_collection, mapped_by, &owner, &kept)?;
        }
        Ok(())
    }

    /// Children stored against `owner` that are not in `kept` are deleted
    /// when the relationship removes orphans, otherwise their foreign key is
    /// cleared.
    fn detach(
        &self,
        relationship: &Relationship,
        child_collection: &MappingCollection,
        mapped_by: &str,
        owner: &Value,
        kept: &[Value],
    ) -> Result<()> {
        let orphan_removal = relationship.is_orphan_removal() && self.delete_entities();
        if !orphan_removal && !self.delete_relationships() {
            return Ok(());
        }

        let options = FindOptions::new().filter(CriteriaExpression::eq(mapped_by, owner.clone()));
        let stored = ObjectFetcher::new(self.db, child_collection).objects(&options)?;
        let key_property = child_collection.primary_key_property();
        let key_column = child_collection
            .primary_keys()
            .next()
            .and_then(PropertyMapping::short_column_name);

        for child in &stored {
            let key = child.value(key_property);
            if contains(kept, &key) {
                continue;
            }

            if orphan_removal {
                debug!(class = child.class(), %key, "removing orphan");
                ObjectRemover::new(self.db, &DeleteOptions::default()).remove(child, child_collection)?;
            } else if let (Some(foreign_key), Some(key_column)) =
                (relationship.target_join_column.as_deref(), key_column)
            {
                let statement = UpdateQueryBuilder::new(child_collection.table_name())
                    .set(foreign_key, Value::Null)
                    .key(key_column, key)
                    .build();
                if let Some(statement) = statement {
                    self.db.execute(&statement)?;
                }
            }
        }
        Ok(())
    }

    /// Saves the children of a many-to-many relationship and brings the
    /// join rows in line with the collection.
    fn links(
        &self,
        object: &mut Object,
        mapping: &PropertyMapping,
        collection: &MappingCollection,
        is_new: bool,
    ) -> Result<()> {
        let (Some(relationship), Some(resolved), Some(class)) =
            (&mapping.relationship, &mapping.target, mapping.child_class())
        else {
            return Ok(());
        };
        let (Some(table), Some(source), Some(target)) = (
            relationship.join_table.as_deref(),
            relationship.source_join_column.as_deref(),
            relationship.target_join_column.as_deref(),
        ) else {
            return Err(Error::mapping(
                &mapping.class_name,
                Some(mapping.property_name.as_str()),
                "many-to-many relationship not resolved",
            ));
        };

        let owner = owner_value(object, collection, &resolved.owner_key);
        if owner.is_null() {
            return Ok(());
        }

        let child_collection = self.db.collection(class)?;
        let child_key = resolved.child_key.as_deref().unwrap_or("id");
        let key_property = column_property(&child_collection, &[], child_key)
            .map(|key| key.property_name.clone());
        let save_children = self.save_children();

        let Some(Field::Collection(children)) = loaded_mut(object, &mapping.property_name) else {
            return Ok(());
        };

        let mut kept = vec![];
        for child in children.iter_mut() {
            if save_children {
                self.save_object(child, &child_collection, None)?;
            }
            let key = key_property
                .as_deref()
                .map(|property| child.value(property))
                .unwrap_or_default();
            if !key.is_null() {
                kept.push(key);
            }
        }

        let stored = if is_new {
            vec![]
        } else {
            linked_keys(self.db, table, source, target, &owner)?
        };

        for key in &kept {
            if contains(&stored, key) {
                continue;
            }
            let statement = InsertQueryBuilder::new(table)
                .set(source, owner.clone())
                .set(target, key.clone())
                .replace(true)
                .build();
            self.db.execute(&statement)?;
        }

        for key in &stored {
            if contains(&kept, key) {
                continue;
            }

            if self.delete_relationships() {
                let statement = DeleteQueryBuilder::new(table)
                    .key(source, owner.clone())
                    .key(target, key.clone())
                    .build();
                if let Some(statement) = statement {
                    self.db.execute(&statement)?;
                }
            }

            if relationship.is_orphan_removal() && self.delete_entities() {
                self.remove_all(
                    class,
                    &Lookup::Column {
                        column: child_key.to_string(),
                        value: key.clone(),
                    },
                )?;
            }
        }
        Ok(())
    }

    fn remove_all(&self, class: &str, lookup: &Lookup) -> Result<()> {
        let Field::Collection(children) = lookup.load(self.db, class, true, &[])? else {
            return Ok(());
        };

        let collection = self.db.collection(class)?;
        let options = DeleteOptions::default();
        let remover = ObjectRemover::new(self.db, &options);
        for child in &children {
            debug!(class, "removing orphan");
            remover.remove(child, &collection)?;
        }
        Ok(())
    }

    /// The stored form of a property value: entities reduce to their key,
    /// data maps are reversed and the type handler converts the rest.
    fn persistence_value(&self, mapping: &PropertyMapping, value: Value) -> Result<Value> {
        let mut value = value.into_key_value();

        let data_map = mapping.column.as_ref().and_then(|column| column.data_map.as_ref());
        if let Some(raw) = data_map.and_then(|data_map| data_map.reverse(&value)) {
            value = raw;
        }

        let mut converted = value.clone();
        if self
            .db
            .handler()
            .to_persistence_value(&mut converted, mapping.data_type(), mapping.format())
        {
            Ok(converted)
        } else {
            Err(Error::type_conversion(value, "stored value"))
        }
    }
}

/// The field at `name`, unless it is a lazy relationship never accessed.
fn loaded_mut<'o>(object: &'o mut Object, name: &str) -> Option<&'o mut Field> {
    match object.get_mut(name)? {
        Field::Lazy(lazy) => lazy.peek_mut(),
        field => Some(field),
    }
}

fn owner_value(object: &Object, collection: &MappingCollection, column: &str) -> Value {
    column_property(collection, &[], column)
        .map(|owner| object.value(&owner.property_name))
        .unwrap_or_default()
        .into_key_value()
}

fn target_column(relationship: &Relationship) -> &str {
    relationship.target_join_column.as_deref().unwrap_or("id")
}

/// Keys read back from a join table may come as strings, so they are
/// matched loosely.
fn contains(values: &[Value], value: &Value) -> bool {
    values.iter().any(|candidate| candidate.loosely_eq(value))
}
