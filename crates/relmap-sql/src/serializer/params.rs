use super::{Formatter, ToSql};

use relmap_core::Value;
use std::fmt::Write;

/// Accumulates bound parameters.
pub trait Params {
    fn push(&mut self, value: Value) -> Placeholder;
}

/// A numbered placeholder, written as `:param_N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder(pub usize);

impl Placeholder {
    pub fn name(self) -> String {
        format!("param_{}", self.0)
    }
}

impl Params for relmap_core::Params {
    fn push(&mut self, value: Value) -> Placeholder {
        let mut placeholder = Placeholder(self.len() + 1);
        while self.contains_key(&placeholder.name()) {
            placeholder.0 += 1;
        }
        self.insert(placeholder.name(), value);
        placeholder
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let _ = write!(f.dst, ":param_{}", self.0);
    }
}
