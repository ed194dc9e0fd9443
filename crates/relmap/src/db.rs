mod builder;
pub use builder::Builder;

use crate::{transaction::TransactionManager, Model, Object, Repository};

use indexmap::IndexMap;
use relmap_core::{
    Config, DataTypeHandler, FindOptions, MappingCollection, ObjectMapper, Result, Row, SaveOptions,
    Storage, Value,
};
use relmap_sql::Statement;
use tracing::{debug, warn};

use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    sync::Arc,
};

/// Shared state between all `Db` clones.
pub(crate) struct Shared {
    mapper: ObjectMapper,
    handler: Arc<dyn DataTypeHandler>,
    storage: RefCell<Box<dyn Storage>>,
    transactions: RefCell<TransactionManager>,

    /// Mapping collections resolved so far, by class
    collections: RefCell<IndexMap<String, Rc<MappingCollection>>>,
}

/// A handle to the storage and the mapped classes.
///
/// Cloning is cheap; clones share the storage connection and the transaction
/// state. Lazy relationships hold a clone to load themselves.
#[derive(Clone)]
pub struct Db {
    shared: Rc<Shared>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub(crate) fn new(
        mapper: ObjectMapper,
        handler: Arc<dyn DataTypeHandler>,
        storage: Box<dyn Storage>,
    ) -> Db {
        Db {
            shared: Rc::new(Shared {
                mapper,
                handler,
                storage: RefCell::new(storage),
                transactions: RefCell::new(TransactionManager::default()),
                collections: RefCell::new(IndexMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        self.shared.mapper.config()
    }

    pub fn handler(&self) -> &dyn DataTypeHandler {
        &*self.shared.handler
    }

    /// The mapping collection of `class`, resolved once per handle.
    pub fn collection(&self, class: &str) -> Result<Rc<MappingCollection>> {
        if let Some(collection) = self.shared.collections.borrow().get(class) {
            return Ok(collection.clone());
        }

        let collection = Rc::new(self.shared.mapper.mapping_collection_for_class(class)?);
        debug!(class, mappings = collection.len(), "resolved mapping collection");

        self.shared
            .collections
            .borrow_mut()
            .insert(class.to_string(), collection.clone());
        Ok(collection)
    }

    pub fn repository(&self, class: &str) -> Result<Repository> {
        Ok(Repository::new(self.clone(), self.collection(class)?))
    }

    /// Finds every instance of `M` matching `options`.
    pub fn find<M: Model>(&self, options: FindOptions) -> Result<Vec<M>> {
        self.repository(M::CLASS)?
            .find_by(options)?
            .iter()
            .map(M::load)
            .collect()
    }

    pub fn find_one<M: Model>(&self, options: FindOptions) -> Result<Option<M>> {
        self.repository(M::CLASS)?
            .find_one_by(options)?
            .as_ref()
            .map(M::load)
            .transpose()
    }

    /// Inserts `model` and returns the saved object, including any generated
    /// key.
    pub fn create<M: Model>(&self, model: &M) -> Result<Object> {
        let mut object = Object::new(M::CLASS);
        model.store(&mut object);
        self.repository(M::CLASS)?
            .save(&mut object, SaveOptions::default())?;
        Ok(object)
    }

    /// Begins a transaction, or joins the open one.
    pub fn begin_transaction(&self) -> Result<()> {
        let mut storage = self.shared.storage.borrow_mut();
        self.shared
            .transactions
            .borrow_mut()
            .start(&mut **storage)
    }

    /// Commits the transaction once the outermost level commits.
    pub fn commit(&self) -> Result<()> {
        let mut storage = self.shared.storage.borrow_mut();
        self.shared
            .transactions
            .borrow_mut()
            .commit(&mut **storage)
    }

    /// Rolls back the whole transaction, whatever the nesting depth.
    pub fn rollback(&self) -> Result<()> {
        let mut storage = self.shared.storage.borrow_mut();
        self.shared
            .transactions
            .borrow_mut()
            .rollback(&mut **storage)
    }

    pub fn transaction_depth(&self) -> u32 {
        self.shared.transactions.borrow().depth()
    }

    /// Runs `f` inside a transaction: committed when `f` succeeds, rolled
    /// back when it fails.
    pub fn transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.begin_transaction()?;

        match f() {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.rollback() {
                    warn!(%rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    pub(crate) fn execute(&self, statement: &Statement) -> Result<()> {
        debug!(sql = %statement.sql, params = statement.params.len(), "executing statement");

        self.shared
            .storage
            .borrow_mut()
            .execute_query(&statement.sql, &statement.params, false)
            .map_err(|cause| relmap_core::Error::storage(&statement.sql, &statement.params, cause))
    }

    pub(crate) fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        self.execute(statement)?;
        self.with_storage(statement, |storage| storage.fetch_results())
    }

    pub(crate) fn query_values(&self, statement: &Statement) -> Result<Vec<Value>> {
        self.execute(statement)?;
        self.with_storage(statement, |storage| storage.fetch_values())
    }

    pub(crate) fn query_value(&self, statement: &Statement) -> Result<Value> {
        self.execute(statement)?;
        self.with_storage(statement, |storage| storage.fetch_value())
    }

    /// Executes an INSERT and returns the generated key.
    pub(crate) fn insert(&self, statement: &Statement) -> Result<Value> {
        self.execute(statement)?;
        Ok(self.shared.storage.borrow().last_insert_id())
    }

    /// Executes a write and returns the number of affected rows.
    pub(crate) fn write(&self, statement: &Statement) -> Result<u64> {
        self.execute(statement)?;
        Ok(self.shared.storage.borrow().affected_record_count())
    }

    fn with_storage<T>(
        &self,
        statement: &Statement,
        f: impl FnOnce(&mut dyn Storage) -> Result<T>,
    ) -> Result<T> {
        let mut storage = self.shared.storage.borrow_mut();
        f(&mut **storage)
            .map_err(|cause| relmap_core::Error::storage(&statement.sql, &statement.params, cause))
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("storage", &self.shared.storage)
            .field("transaction_depth", &self.transaction_depth())
            .finish_non_exhaustive()
    }
}
