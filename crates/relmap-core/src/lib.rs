pub mod cache;
pub use cache::{Cache, MemoryCache};

pub mod class;
pub use class::{ClassDescriptor, ClassRegistry, PropertyDescriptor, PropertyKind};

pub mod config;
pub use config::Config;

pub mod criteria;
pub use criteria::{CriteriaExpression, Operator, Qb};

mod error;
pub use error::Error;

pub mod mapping;
pub use mapping::{MappingCollection, ObjectMapper, PropertyMapping};

pub mod naming;
pub use naming::{NameResolver, NamingStrategy};

pub mod options;
pub use options::{DeleteOptions, FindOptions, SaveOptions};

pub mod provider;
pub use provider::MappingProvider;

pub mod schema;

pub mod storage;
pub use storage::Storage;

pub mod type_handler;
pub use type_handler::{DataTypeHandler, DefaultTypeHandler};

pub mod value;
pub use value::{ObjectReference, Value};

use indexmap::IndexMap;

/// A Result type alias that uses relmap's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Bound statement parameters, keyed by placeholder name without the colon.
pub type Params = IndexMap<String, Value>;

/// One result row, keyed by column alias.
pub type Row = IndexMap<String, Value>;
