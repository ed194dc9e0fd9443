//! Statement builders.
//!
//! SELECT statements are generated from a mapping collection and find
//! options; INSERT, UPDATE and DELETE statements from column assignments
//! prepared by the persister.

mod criteria;

mod delete;
pub use delete::DeleteQueryBuilder;

mod insert;
pub use insert::InsertQueryBuilder;

mod select;
pub use select::SelectQueryBuilder;

mod update;
pub use update::UpdateQueryBuilder;

use crate::serializer::{Formatter, Ident, Params, ToSql};

use relmap_core::Value;

/// `` `column` = :param_N ``
struct Assignment<'a>(&'a str, &'a Value);

impl ToSql for Assignment<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Ident(self.0) " = " self.1);
    }
}
