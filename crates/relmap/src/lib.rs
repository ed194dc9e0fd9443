mod binder;
pub use binder::ObjectBinder;

pub mod db;
pub use db::Db;

mod fetcher;

mod lazy;
pub use lazy::Lazy;

mod model;
pub use model::Model;

pub mod object;
pub use object::{Field, Object};

mod persister;

mod remover;

mod repository;
pub use repository::Repository;

mod transaction;

pub use relmap_core::{
    criteria::{Criteria, OrderBy},
    schema, Config, CriteriaExpression, DeleteOptions, Error, FindOptions, Operator, Qb, Result,
    SaveOptions, Storage, Value,
};
