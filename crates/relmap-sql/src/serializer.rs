//! Building blocks for writing SQL text.
//!
//! Fragments implement [`ToSql`] and are written into a [`Formatter`] with
//! the `fmt!` macro. Values are never written inline: they are pushed onto
//! the parameter store and replaced by a placeholder.

#[macro_use]
mod fmt;
pub(crate) use fmt::ToSql;

mod delim;
pub(crate) use delim::{Comma, Delimited};

mod ident;
pub(crate) use ident::{Column, Ident};

mod params;
pub use params::{Params, Placeholder};

/// Writes SQL into `dst`, binding values into `params`.
pub(crate) struct Formatter<'a, P> {
    /// Where to write the serialized SQL
    pub(crate) dst: &'a mut String,

    /// Where to store parameters
    pub(crate) params: &'a mut P,
}

impl<'a, P: Params> Formatter<'a, P> {
    pub(crate) fn new(dst: &'a mut String, params: &'a mut P) -> Formatter<'a, P> {
        Formatter { dst, params }
    }
}

/// Serializes a single fragment into a new string.
pub(crate) fn to_sql<P: Params>(fragment: impl ToSql, params: &mut P) -> String {
    let mut dst = String::new();
    let mut f = Formatter::new(&mut dst, params);
    fragment.to_sql(&mut f);
    dst
}
