use crate::fetcher::{column_property, Lookup};
use crate::{Db, Field, Object};

use relmap_core::{DeleteOptions, MappingCollection, PropertyMapping, Result, Value};
use relmap_sql::DeleteQueryBuilder;
use tracing::debug;

/// Deletes objects, following cascade-delete relationships.
///
/// Nothing is deleted for an object whose primary key is null.
pub(crate) struct ObjectRemover<'a> {
    db: &'a Db,
    options: &'a DeleteOptions,
}

impl<'a> ObjectRemover<'a> {
    pub(crate) fn new(db: &'a Db, options: &'a DeleteOptions) -> ObjectRemover<'a> {
        ObjectRemover { db, options }
    }

    /// Deletes `object` in a transaction. Returns whether a row was deleted.
    pub(crate) fn delete(&self, object: &Object) -> Result<bool> {
        self.db.transaction(|| {
            let collection = self.db.collection(object.class())?;
            self.remove(object, &collection)
        })
    }

    pub(crate) fn remove(&self, object: &Object, collection: &MappingCollection) -> Result<bool> {
        let delete_entities = self
            .options
            .delete_entities
            .unwrap_or_else(|| !self.db.config().disable_delete_entities());
        if !delete_entities {
            debug!(class = object.class(), "not deleting; entity deletion is disabled");
            return Ok(false);
        }

        let mut delete = DeleteQueryBuilder::new(collection.table_name());
        for key in collection.primary_keys() {
            if let Some(column) = key.short_column_name() {
                let value = object
                    .stored(&key.property_name)
                    .cloned()
                    .unwrap_or_else(|| object.value(&key.property_name));
                delete = delete.key(column, value);
            }
        }

        let Some(statement) = delete.build() else {
            debug!(class = object.class(), "not deleting; primary key is null");
            return Ok(false);
        };

        let delete_links = self
            .options
            .delete_relationships
            .unwrap_or_else(|| !self.db.config().disable_delete_relationships());

        // Children referenced by this row's foreign keys go after the row
        let mut owned = vec![];

        for mapping in collection.properties_at(&[]) {
            if !mapping.is_relationship() || mapping.is_embedded() {
                continue;
            }
            let Some(relationship) = &mapping.relationship else {
                continue;
            };
            let cascade = self.options.cascade && relationship.is_cascade_delete();

            if mapping.is_many_to_many() {
                let children = if cascade {
                    self.related(object, mapping, collection)?
                } else {
                    vec![]
                };

                if delete_links {
                    self.unlink(object, mapping, collection)?;
                }
                self.remove_children(mapping, &children)?;
            } else if cascade {
                let children = self.related(object, mapping, collection)?;
                if mapping.is_owning_side() {
                    owned.push((mapping, children));
                } else {
                    self.remove_children(mapping, &children)?;
                }
            }
        }

        let deleted = self.db.write(&statement)? > 0;
        debug!(class = object.class(), deleted, "deleted object");

        for (mapping, children) in owned {
            self.remove_children(mapping, &children)?;
        }

        Ok(deleted)
    }

    fn remove_children(&self, mapping: &PropertyMapping, children: &[Object]) -> Result<()> {
        let Some(class) = mapping.child_class() else {
            return Ok(());
        };
        if children.is_empty() {
            return Ok(());
        }

        let collection = self.db.collection(class)?;
        for child in children {
            self.remove(child, &collection)?;
        }
        Ok(())
    }

    /// Removes the join rows of a many-to-many relationship.
    fn unlink(
        &self,
        object: &Object,
        mapping: &PropertyMapping,
        collection: &MappingCollection,
    ) -> Result<()> {
        let (Some(relationship), Some(target)) = (&mapping.relationship, &mapping.target) else {
            return Ok(());
        };
        let (Some(table), Some(source)) = (
            relationship.join_table.as_deref(),
            relationship.source_join_column.as_deref(),
        ) else {
            return Ok(());
        };

        let owner = column_property(collection, &[], &target.owner_key)
            .map(|owner| object.value(&owner.property_name))
            .unwrap_or_default();

        if let Some(statement) = DeleteQueryBuilder::new(table).key(source, owner).build() {
            self.db.execute(&statement)?;
        }
        Ok(())
    }

    /// The children of a relationship, loading them when the object does
    /// not hold them yet.
    fn related(
        &self,
        object: &Object,
        mapping: &PropertyMapping,
        collection: &MappingCollection,
    ) -> Result<Vec<Object>> {
        let field = match object.get(&mapping.property_name) {
            Some(Field::Lazy(lazy)) => lazy.get()?.clone(),
            Some(Field::Value(key)) if mapping.is_owning_side() => {
                self.lookup(mapping, collection, object, Some(key.clone()))?
            }
            Some(field @ (Field::Object(_) | Field::Collection(_))) => field.clone(),
            _ => self.lookup(mapping, collection, object, None)?,
        };

        Ok(match field {
            Field::Object(child) => child.into_iter().collect(),
            Field::Collection(children) => children,
            _ => vec![],
        })
    }

    fn lookup(
        &self,
        mapping: &PropertyMapping,
        collection: &MappingCollection,
        object: &Object,
        key: Option<Value>,
    ) -> Result<Field> {
        let (Some(relationship), Some(target), Some(class)) =
            (&mapping.relationship, &mapping.target, mapping.child_class())
        else {
            return Ok(Field::Collection(vec![]));
        };

        let owner = |column: &str| {
            column_property(collection, &[], column)
                .map(|owner| object.value(&owner.property_name))
                .unwrap_or_default()
        };

        let lookup = if mapping.is_owning_side() {
            let key = key
                .or_else(|| object.stored(&mapping.property_name).cloned())
                .unwrap_or_default()
                .into_key_value();
            Lookup::Column {
                column: relationship
                    .target_join_column
                    .clone()
                    .unwrap_or_else(|| "id".to_string()),
                value: key,
            }
        } else if mapping.is_many_to_many() {
            Lookup::Linked {
                table: relationship.join_table.clone().unwrap_or_default(),
                source: relationship.source_join_column.clone().unwrap_or_default(),
                target: relationship.target_join_column.clone().unwrap_or_default(),
                child_key: target.child_key.clone().unwrap_or_else(|| "id".to_string()),
                value: owner(&target.owner_key),
            }
        } else if let Some(mapped_by) = &relationship.mapped_by {
            Lookup::Property {
                property: mapped_by.clone(),
                value: owner(relationship.source_join_column.as_deref().unwrap_or("id")),
            }
        } else {
            return Ok(Field::Collection(vec![]));
        };

        if lookup.value().is_null() {
            return Ok(Field::Collection(vec![]));
        }

        let order_by = relationship.order_by.clone().unwrap_or_default();
        lookup.load(self.db, class, mapping.is_to_many(), &order_by)
    }
}
