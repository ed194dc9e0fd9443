//! Per-call options for find, save and delete operations.

use crate::criteria::{Criteria, OrderBy};
use crate::schema::JoinType;

use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// Options for a find call.
#[derive(Debug, Clone)]
pub struct FindOptions {
    /// Raw criteria, normalized against the root primary key when the query
    /// is built
    pub criteria: Criteria,

    /// Ordering; the primary key ascending when empty
    pub order_by: Vec<OrderBy>,

    pub limit: Option<u64>,

    pub offset: Option<u64>,

    /// Return every matching row instead of the first
    pub multiple: bool,

    /// Only count matching rows
    pub count_only: bool,

    /// Hydrate entities; when unset rows are returned as they come back
    pub bind_to_entities: bool,

    /// Keep only the latest row per group
    pub latest: Option<Latest>,

    /// Additional joins declared by the caller
    pub joins: Vec<QueryJoin>,

    /// Replacements for generated clauses, keyed by lowercase clause name
    pub sql_overrides: IndexMap<String, ClauseOverride>,
}

/// Groupwise maximum: for each distinct value of `group_by`, keep the row
/// with the greatest `order_property`.
#[derive(Debug, Clone, PartialEq)]
pub struct Latest {
    pub group_by: Vec<String>,
    pub order_property: String,
}

/// A join to another class under a caller-chosen alias.
///
/// `on` is raw SQL; property paths wrapped in `%` are resolved, and paths of
/// the form `alias.property` refer to the joined class.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryJoin {
    pub class: String,
    pub alias: String,
    pub join_type: JoinType,
    pub on: String,
}

/// Replaces one generated clause.
#[derive(Clone)]
pub enum ClauseOverride {
    /// Raw SQL used instead of the generated clause, without its keyword
    Sql(String),

    /// Receives the generated clause and returns the replacement
    Callable(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

/// The clauses that accept an override.
pub const CLAUSES: [&str; 10] = [
    "select", "from", "latest", "joins", "where", "group_by", "having", "order_by", "limit",
    "offset",
];

/// Options for a save call.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Save child entities too; the configured default when unset
    pub save_children: Option<bool>,

    /// Overwrite an existing row with the same key
    pub replace: bool,

    /// Clear foreign keys of detached children; enabled unless configured
    /// otherwise when unset
    pub delete_relationships: Option<bool>,

    /// Delete orphaned children; enabled unless configured otherwise when
    /// unset
    pub delete_entities: Option<bool>,
}

/// Options for a delete call.
#[derive(Debug, Clone)]
pub struct DeleteOptions {
    /// Follow cascade-delete relationships
    pub cascade: bool,

    /// Remove many-to-many join rows referencing the entity
    pub delete_relationships: Option<bool>,

    /// Delete entity rows at all; `None` defers to the config
    pub delete_entities: Option<bool>,
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn filter(mut self, criteria: impl Into<Criteria>) -> FindOptions {
        self.criteria = criteria.into();
        self
    }

    /// Appends `"path"`, `"path DESC"` or a comma separated list of them.
    pub fn order_by(mut self, order_by: &str) -> FindOptions {
        self.order_by.extend(
            order_by
                .split(',')
                .filter(|item| !item.trim().is_empty())
                .map(OrderBy::parse),
        );
        self
    }

    pub fn order(mut self, order_by: OrderBy) -> FindOptions {
        self.order_by.push(order_by);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> FindOptions {
        self.offset = Some(offset);
        self
    }

    pub fn multiple(mut self, multiple: bool) -> FindOptions {
        self.multiple = multiple;
        self
    }

    pub fn count_only(mut self) -> FindOptions {
        self.count_only = true;
        self
    }

    pub fn raw_rows(mut self) -> FindOptions {
        self.bind_to_entities = false;
        self
    }

    pub fn latest(mut self, group_by: &[&str], order_property: &str) -> FindOptions {
        self.latest = Some(Latest {
            group_by: group_by.iter().map(|path| path.to_string()).collect(),
            order_property: order_property.to_string(),
        });
        self
    }

    pub fn join(mut self, join: QueryJoin) -> FindOptions {
        self.joins.push(join);
        self
    }

    /// Replaces a clause with raw SQL. The clause name is matched
    /// case-insensitively.
    pub fn override_sql(mut self, clause: &str, sql: impl Into<String>) -> FindOptions {
        self.sql_overrides
            .insert(clause_key(clause), ClauseOverride::Sql(sql.into()));
        self
    }

    /// Replaces a clause with the result of `f`, which receives the
    /// generated clause.
    pub fn override_with(
        mut self,
        clause: &str,
        f: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> FindOptions {
        self.sql_overrides
            .insert(clause_key(clause), ClauseOverride::Callable(Arc::new(f)));
        self
    }

    pub fn sql_override(&self, clause: &str) -> Option<&ClauseOverride> {
        self.sql_overrides.get(&clause_key(clause))
    }
}

fn clause_key(clause: &str) -> String {
    clause.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

impl Default for FindOptions {
    fn default() -> FindOptions {
        FindOptions {
            criteria: Criteria::None,
            order_by: vec![],
            limit: None,
            offset: None,
            multiple: true,
            count_only: false,
            bind_to_entities: true,
            latest: None,
            joins: vec![],
            sql_overrides: IndexMap::new(),
        }
    }
}

impl QueryJoin {
    pub fn new(class: impl Into<String>, alias: impl Into<String>, on: impl Into<String>) -> QueryJoin {
        QueryJoin {
            class: class.into(),
            alias: alias.into(),
            join_type: JoinType::Left,
            on: on.into(),
        }
    }

    pub fn inner(mut self) -> QueryJoin {
        self.join_type = JoinType::Inner;
        self
    }
}

impl ClauseOverride {
    /// Applies the override to the generated clause.
    pub fn apply(&self, generated: &str) -> String {
        match self {
            ClauseOverride::Sql(sql) => sql.clone(),
            ClauseOverride::Callable(f) => f(generated),
        }
    }
}

impl fmt::Debug for ClauseOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseOverride::Sql(sql) => f.debug_tuple("Sql").field(sql).finish(),
            ClauseOverride::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl SaveOptions {
    pub fn new() -> SaveOptions {
        SaveOptions::default()
    }

    pub fn save_children(mut self, save_children: bool) -> SaveOptions {
        self.save_children = Some(save_children);
        self
    }

    pub fn replace(mut self) -> SaveOptions {
        self.replace = true;
        self
    }

    pub fn delete_relationships(mut self, enabled: bool) -> SaveOptions {
        self.delete_relationships = Some(enabled);
        self
    }

    pub fn delete_entities(mut self, enabled: bool) -> SaveOptions {
        self.delete_entities = Some(enabled);
        self
    }
}

impl DeleteOptions {
    pub fn new() -> DeleteOptions {
        DeleteOptions::default()
    }

    pub fn cascade(mut self, cascade: bool) -> DeleteOptions {
        self.cascade = cascade;
        self
    }

    pub fn delete_relationships(mut self, enabled: bool) -> DeleteOptions {
        self.delete_relationships = Some(enabled);
        self
    }

    pub fn delete_entities(mut self, enabled: bool) -> DeleteOptions {
        self.delete_entities = Some(enabled);
        self
    }
}

impl Default for DeleteOptions {
    fn default() -> DeleteOptions {
        DeleteOptions {
            cascade: true,
            delete_relationships: None,
            delete_entities: None,
        }
    }
}
