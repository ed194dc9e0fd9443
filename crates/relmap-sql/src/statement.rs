use std::fmt;

/// A generated SQL statement and the parameters bound to its `:name`
/// placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: relmap_core::Params,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: relmap_core::Params) -> Statement {
        Statement {
            sql: sql.into(),
            params,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
