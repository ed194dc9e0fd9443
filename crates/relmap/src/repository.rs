use crate::fetcher::ObjectFetcher;
use crate::persister::ObjectPersister;
use crate::remover::ObjectRemover;
use crate::{Db, Object};

use relmap_core::{
    CriteriaExpression, DeleteOptions, Error, FindOptions, MappingCollection, Result, Row,
    SaveOptions, Value,
};
use relmap_sql::SqlStringReplacer;

use std::rc::Rc;

/// Finds, counts, saves and deletes the entities of one class.
#[derive(Debug, Clone)]
pub struct Repository {
    db: Db,
    collection: Rc<MappingCollection>,
}

impl Repository {
    pub(crate) fn new(db: Db, collection: Rc<MappingCollection>) -> Repository {
        Repository { db, collection }
    }

    pub fn class_name(&self) -> &str {
        self.collection.class_name()
    }

    pub fn collection(&self) -> &MappingCollection {
        &self.collection
    }

    fn fetcher(&self) -> ObjectFetcher<'_> {
        ObjectFetcher::new(&self.db, &self.collection)
    }

    /// Entities matching `options`. Without entity binding every row comes
    /// back as an object with one field per column alias.
    pub fn find_by(&self, mut options: FindOptions) -> Result<Vec<Object>> {
        options.count_only = false;

        if !options.bind_to_entities {
            return Ok(self
                .fetcher()
                .rows(&options)?
                .into_iter()
                .map(|row| Object::from_row(self.class_name(), row))
                .collect());
        }

        let mut objects = self.fetcher().objects(&options)?;
        if !options.multiple {
            objects.truncate(1);
        }
        Ok(objects)
    }

    /// The first entity matching `options`.
    ///
    /// When a to-many relationship is joined, the row limit is left off so
    /// the entity's collection is complete.
    pub fn find_one_by(&self, mut options: FindOptions) -> Result<Option<Object>> {
        options.multiple = false;
        if !self.collection.has_expanded_to_many() {
            options.limit = Some(1);
        }
        Ok(self.find_by(options)?.into_iter().next())
    }

    /// The entity with primary key `key`.
    pub fn find(&self, key: impl Into<Value>) -> Result<Option<Object>> {
        let criteria = CriteriaExpression::eq(self.collection.primary_key_property(), key);
        self.find_one_by(FindOptions::new().filter(criteria))
    }

    /// Like [`find`](Repository::find), failing when there is no such
    /// entity.
    pub fn get(&self, key: impl Into<Value>) -> Result<Object> {
        let key = key.into();
        self.find(key.clone())?.ok_or_else(|| {
            Error::record_not_found(format!("{} with key {key}", self.class_name()))
        })
    }

    /// Result rows as the storage returns them.
    pub fn find_rows(&self, mut options: FindOptions) -> Result<Vec<Row>> {
        options.count_only = false;
        self.fetcher().rows(&options)
    }

    pub fn count(&self, mut options: FindOptions) -> Result<u64> {
        options.count_only = true;
        self.fetcher().count(&options)
    }

    /// Values of the property at `path` for every matching row.
    pub fn find_values_by(&self, path: &str, options: FindOptions) -> Result<Vec<Value>> {
        let options = self.select_property(path, options)?;
        self.fetcher().values(&options)
    }

    /// The value of the property at `path` for the first matching row.
    pub fn find_value_by(&self, path: &str, mut options: FindOptions) -> Result<Option<Value>> {
        options.limit = Some(1);
        Ok(self.find_values_by(path, options)?.into_iter().next())
    }

    fn select_property(&self, path: &str, mut options: FindOptions) -> Result<FindOptions> {
        let column = SqlStringReplacer::new(&self.collection, self.db.handler())
            .column_for(path)
            .ok_or_else(|| {
                Error::query(format!(
                    "`{path}` is not a mapped property of {}",
                    self.class_name()
                ))
            })?;

        options.count_only = false;
        options.bind_to_entities = false;
        Ok(options.override_sql("select", format!("{column} AS `value`")))
    }

    /// Inserts a new entity or writes the changed properties of a loaded
    /// one, together with its children.
    pub fn save(&self, object: &mut Object, options: SaveOptions) -> Result<()> {
        self.check_class(object)?;
        ObjectPersister::new(&self.db, &options).save(object)
    }

    /// Deletes an entity. Returns `false` when nothing was deleted, which
    /// includes an entity without a primary key value.
    pub fn delete(&self, object: &Object, options: DeleteOptions) -> Result<bool> {
        self.check_class(object)?;
        ObjectRemover::new(&self.db, &options).delete(object)
    }

    fn check_class(&self, object: &Object) -> Result<()> {
        if object.class() != self.class_name() {
            return Err(Error::query(format!(
                "cannot store a {} in the {} repository",
                object.class(),
                self.class_name()
            )));
        }
        Ok(())
    }
}
