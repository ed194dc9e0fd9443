#[macro_use]
pub mod serializer;
pub use serializer::{Params, Placeholder};

pub mod builder;
pub use builder::{DeleteQueryBuilder, InsertQueryBuilder, SelectQueryBuilder, UpdateQueryBuilder};

pub mod replacer;
pub use replacer::SqlStringReplacer;

mod statement;
pub use statement::Statement;
