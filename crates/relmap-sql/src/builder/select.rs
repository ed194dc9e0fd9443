use super::criteria::CriteriaSerializer;
use crate::replacer::{column_expression, unknown_property, SqlStringReplacer};
use crate::serializer::{to_sql, Ident};
use crate::Statement;

use indexmap::IndexMap;
use relmap_core::criteria::{normalize, CriteriaExpression, OrderBy};
use relmap_core::options::ClauseOverride;
use relmap_core::{DataTypeHandler, Error, FindOptions, MappingCollection, PropertyMapping, Result};
use tracing::trace;

/// Alias of the self-join used to keep the latest row per group.
pub const LATEST_ALIAS: &str = "latest_compare";

/// Builds the SELECT statement for a find call.
///
/// Clauses are generated in this order, each replaceable through
/// [`FindOptions::override_sql`]: `select`, `from`, `latest`, `joins`,
/// `where`, `group_by`, `having`, `order_by`, `limit`, `offset`.
///
/// Count queries select `COUNT(*)` directly unless the query groups rows,
/// in which case the full query is wrapped in a subquery.
#[derive(Debug)]
pub struct SelectQueryBuilder<'a> {
    collection: &'a MappingCollection,
    options: &'a FindOptions,
    handler: &'a dyn DataTypeHandler,

    /// Mapping collections of the classes joined by the query, by alias
    joins: IndexMap<String, &'a MappingCollection>,
}

/// State for building one statement.
struct Render<'b, 'a> {
    builder: &'b SelectQueryBuilder<'a>,
    replacer: &'b SqlStringReplacer<'a>,
    criteria: &'b [CriteriaExpression],
}

impl<'a> SelectQueryBuilder<'a> {
    pub fn new(
        collection: &'a MappingCollection,
        options: &'a FindOptions,
        handler: &'a dyn DataTypeHandler,
    ) -> SelectQueryBuilder<'a> {
        SelectQueryBuilder {
            collection,
            options,
            handler,
            joins: IndexMap::new(),
        }
    }

    /// Supplies the mapping of a class joined under `alias` by the query.
    pub fn join_collection(
        mut self,
        alias: impl Into<String>,
        collection: &'a MappingCollection,
    ) -> SelectQueryBuilder<'a> {
        self.joins.insert(alias.into(), collection);
        self
    }

    /// Generates the statement. Every call starts from an empty parameter
    /// list.
    pub fn build(&self) -> Result<Statement> {
        let mut replacer = SqlStringReplacer::new(self.collection, self.handler);
        for join in &self.options.joins {
            let collection = self.joins.get(&join.alias).ok_or_else(|| {
                Error::query(format!(
                    "no mapping supplied for `{}` joined as `{}`",
                    join.class, join.alias
                ))
            })?;
            replacer = replacer.with_join(join.alias.clone(), *collection);
        }

        let criteria = normalize(
            self.options.criteria.clone(),
            self.collection.primary_key_property(),
        )?;

        let render = Render {
            builder: self,
            replacer: &replacer,
            criteria: &criteria,
        };

        let mut params = relmap_core::Params::new();
        let sql = if !self.options.count_only {
            render.select(false, &mut params)?
        } else if render.counts_directly() {
            render.select(true, &mut params)?
        } else {
            let query = render.select(false, &mut params)?;
            format!("SELECT COUNT(*) FROM ({query}) subquery")
        };

        trace!(class = self.collection.class_name(), %sql, params = params.len(), "built select");
        Ok(Statement::new(sql, params))
    }
}

impl<'b, 'a> Render<'b, 'a> {
    fn collection(&self) -> &'a MappingCollection {
        self.builder.collection
    }

    fn options(&self) -> &'a FindOptions {
        self.builder.options
    }

    /// A count can select `COUNT(*)` directly when the query would not be
    /// grouped: nothing is aggregated and no grouping was supplied.
    fn counts_directly(&self) -> bool {
        let serializer = CriteriaSerializer::new(self.replacer);
        let options = self.options();

        !self.collection().iter().any(PropertyMapping::is_aggregate)
            && !self.criteria.iter().any(|expr| serializer.is_having(expr))
            && options.sql_override("group_by").is_none()
            && options.sql_override("having").is_none()
    }

    fn select(&self, count: bool, params: &mut relmap_core::Params) -> Result<String> {
        let serializer = CriteriaSerializer::new(self.replacer);
        let (having, filters): (Vec<&CriteriaExpression>, Vec<&CriteriaExpression>) = self
            .criteria
            .iter()
            .partition(|expr| serializer.is_having(expr));

        let joined = self.joined_mappings(count);
        let latest = self.latest()?;

        let columns = self.clause("select", params, |_| {
            Ok(if count {
                self.count_columns(&joined)
            } else {
                self.columns()
            })
        })?;
        let mut sql = format!("SELECT {columns}");

        let from = self.clause("from", params, |params| {
            Ok(to_sql(Ident(self.collection().table_name()), params))
        })?;
        push_clause(&mut sql, "FROM", &from);

        let latest_join = self.clause("latest", params, |_| {
            Ok(latest
                .as_ref()
                .map(|(join, _)| join.clone())
                .unwrap_or_default())
        })?;
        push_clause(&mut sql, "", &latest_join);

        let joins = self.clause("joins", params, |params| {
            let mut joins = vec![];
            for mapping in &joined {
                joins.push(self.relationship_join(mapping, params)?);
            }
            for join in &self.options().joins {
                joins.push(self.query_join(join, params)?);
            }
            Ok(joins.join(" "))
        })?;
        push_clause(&mut sql, "", &joins);

        let filter = self.clause("where", params, |params| {
            let mut filter = serializer.serialize(&filters, params)?;
            if let Some((_, condition)) = &latest {
                if filter.is_empty() {
                    filter = condition.clone();
                } else {
                    filter = format!("{filter} AND {condition}");
                }
            }
            Ok(filter)
        })?;
        push_clause(&mut sql, "WHERE", &filter);

        if !count {
            let group_by = self.clause("group_by", params, |params| self.group_by(params))?;
            push_clause(&mut sql, "GROUP BY", &group_by);
        }

        let having = self.clause("having", params, |params| serializer.serialize(&having, params))?;
        push_clause(&mut sql, "HAVING", &having);

        if !count {
            let order_by = self.clause("order_by", params, |_| self.order_by())?;
            push_clause(&mut sql, "ORDER BY", &order_by);

            let limit = self.clause("limit", params, |_| {
                Ok(self.options().limit.map(|n| n.to_string()).unwrap_or_default())
            })?;
            push_clause(&mut sql, "LIMIT", &limit);

            let offset = self.clause("offset", params, |_| {
                Ok(self.options().offset.map(|n| n.to_string()).unwrap_or_default())
            })?;
            push_clause(&mut sql, "OFFSET", &offset);
        }

        Ok(sql)
    }

    /// Generates a clause, or applies the caller's override. Raw SQL
    /// overrides replace generation entirely so that no unused parameters
    /// are bound.
    fn clause(
        &self,
        name: &str,
        params: &mut relmap_core::Params,
        generate: impl FnOnce(&mut relmap_core::Params) -> Result<String>,
    ) -> Result<String> {
        let sql = match self.options().sql_override(name) {
            None => return generate(params),
            Some(ClauseOverride::Sql(sql)) => sql.clone(),
            Some(callable) => {
                let generated = generate(params)?;
                callable.apply(&generated)
            }
        };

        match name {
            "limit" | "offset" => Ok(sql.trim().to_string()),
            _ => self.replacer.resolve_sql(sql.trim(), params),
        }
    }

    /// Relationships joined into the query, in mapping order so that a
    /// parent is always joined before its children.
    ///
    /// A count skips optional joins that no criteria reference, unless a
    /// join kept below them needs them as its parent.
    fn joined_mappings(&self, count: bool) -> Vec<&'a PropertyMapping> {
        let collection = self.collection();

        let aggregate_sources: Vec<&str> = if count {
            vec![]
        } else {
            collection
                .iter()
                .filter_map(|mapping| mapping.aggregate_source.as_ref())
                .map(|source| source.relationship_path.as_str())
                .collect()
        };

        let candidates: Vec<&'a PropertyMapping> = collection
            .iter()
            .filter(|mapping| {
                let path = mapping.path();
                (mapping.is_relationship() && mapping.is_expanded() && !mapping.is_embedded())
                    || mapping.is_scalar_join()
                    || (mapping.is_relationship() && aggregate_sources.contains(&path.as_str()))
            })
            .collect();

        if !count {
            return candidates;
        }

        let referenced = self.referenced_paths();
        let needed: Vec<String> = candidates
            .iter()
            .filter(|mapping| is_inner(mapping) || references(&referenced, &mapping.path()))
            .map(|mapping| mapping.path())
            .collect();
        let needed: Vec<&str> = needed.iter().map(String::as_str).collect();

        candidates
            .into_iter()
            .filter(|mapping| references(&needed, &mapping.path()))
            .collect()
    }

    /// Every property path the criteria and the latest-row filter use.
    fn referenced_paths(&self) -> Vec<&'b str> {
        let mut paths = vec![];
        for expr in self.criteria {
            expr.walk(&mut |expr| paths.push(expr.property.as_str()));
        }
        paths
    }

    fn columns(&self) -> String {
        let columns: Vec<String> = self
            .selected()
            .into_iter()
            .map(|(expr, mapping)| format!("{expr} AS `{}`", mapping.alias))
            .collect();

        if columns.is_empty() {
            format!("`{}`.*", self.collection().table_name())
        } else {
            columns.join(", ")
        }
    }

    /// Selected expressions: every column, plus the foreign key of owning
    /// relationships that are not joined so they can be loaded later.
    fn selected(&self) -> Vec<(String, &'a PropertyMapping)> {
        self.collection()
            .iter()
            .filter_map(|mapping| {
                let expr = if mapping.is_column() {
                    column_expression(mapping)
                } else if mapping.is_owning_side() && !mapping.is_expanded() {
                    mapping.full_column_name()
                } else {
                    None
                };
                expr.map(|expr| (expr, mapping))
            })
            .collect()
    }

    fn count_columns(&self, joined: &[&PropertyMapping]) -> String {
        if joined.iter().any(|mapping| mapping.is_to_many()) {
            let keys: Vec<String> = self
                .collection()
                .primary_keys()
                .filter_map(PropertyMapping::full_column_name)
                .collect();

            if !keys.is_empty() {
                return format!("COUNT(DISTINCT {})", keys.join(", "));
            }
        }

        "COUNT(*)".to_string()
    }

    fn relationship_join(
        &self,
        mapping: &PropertyMapping,
        params: &mut relmap_core::Params,
    ) -> Result<String> {
        let (Some(relationship), Some(target)) = (&mapping.relationship, &mapping.target) else {
            return Err(unresolved(mapping, "join target"));
        };

        let keyword = relationship.join_type_or_default().sql();
        let owner = &mapping.table_alias;
        let source = required(mapping, relationship.source_join_column.as_deref(), "source join column")?;
        let target_column = required(mapping, relationship.target_join_column.as_deref(), "target join column")?;

        let custom = match &relationship.join_sql {
            Some(sql) => Some(self.replacer.resolve_sql(sql, params)?),
            None => None,
        };

        if relationship.is_many_to_many() {
            let link_table = required(mapping, relationship.join_table.as_deref(), "join table")?;
            let link = required(mapping, target.link_alias.as_deref(), "join table alias")?;
            let child_key = target.child_key.as_deref().unwrap_or("id");

            let on = custom.unwrap_or_else(|| {
                format!("`{}`.`{child_key}` = `{link}`.`{target_column}`", target.alias)
            });

            return Ok(format!(
                "{keyword} `{link_table}` AS `{link}` ON `{link}`.`{source}` = `{owner}`.`{}` \
                 {keyword} `{}` AS `{}` ON {on}",
                target.owner_key, target.table, target.alias
            ));
        }

        let on = custom.unwrap_or_else(|| {
            format!("`{}`.`{target_column}` = `{owner}`.`{source}`", target.alias)
        });

        Ok(format!(
            "{keyword} `{}` AS `{}` ON {on}",
            target.table, target.alias
        ))
    }

    fn query_join(
        &self,
        join: &relmap_core::options::QueryJoin,
        params: &mut relmap_core::Params,
    ) -> Result<String> {
        let table = self
            .builder
            .joins
            .get(&join.alias)
            .map(|collection| collection.table_name())
            .unwrap_or(join.class.as_str());

        let on = self.replacer.resolve_sql(&join.on, params)?;
        Ok(format!(
            "{} `{table}` AS `{}` ON {on}",
            join.join_type.sql(),
            join.alias
        ))
    }

    /// The self-join keeping the latest row per group, and the condition
    /// discarding rows for which a later one exists.
    fn latest(&self) -> Result<Option<(String, String)>> {
        let Some(latest) = &self.options().latest else {
            return Ok(None);
        };

        let table = self.collection().table_name();
        let mut conditions = vec![];

        for path in &latest.group_by {
            let column = self.root_column(path)?;
            conditions.push(format!(
                "`{LATEST_ALIAS}`.`{column}` = `{table}`.`{column}`"
            ));
        }

        let order = self.root_column(&latest.order_property)?;
        conditions.push(format!("`{LATEST_ALIAS}`.`{order}` > `{table}`.`{order}`"));

        let key = self
            .collection()
            .primary_keys()
            .find_map(PropertyMapping::short_column_name)
            .unwrap_or(order);

        Ok(Some((
            format!(
                "LEFT JOIN `{table}` AS `{LATEST_ALIAS}` ON {}",
                conditions.join(" AND ")
            ),
            format!("`{LATEST_ALIAS}`.`{key}` IS NULL"),
        )))
    }

    fn root_column(&self, path: &str) -> Result<&'a str> {
        self.collection()
            .get(path)
            .filter(|mapping| mapping.is_root())
            .and_then(PropertyMapping::short_column_name)
            .ok_or_else(|| unknown_property(self.collection(), path))
    }

    /// The explicit grouping of the aggregates, or every other selected
    /// column. Empty when nothing is aggregated.
    fn group_by(&self, params: &mut relmap_core::Params) -> Result<String> {
        let aggregates: Vec<&PropertyMapping> = self
            .collection()
            .iter()
            .filter(|mapping| mapping.is_aggregate())
            .collect();

        if aggregates.is_empty() {
            return Ok(String::new());
        }

        let mut explicit: Vec<&str> = vec![];
        for mapping in &aggregates {
            let group_by = mapping
                .column
                .as_ref()
                .and_then(|column| column.aggregate.as_ref())
                .and_then(|aggregate| aggregate.group_by.as_deref());

            if let Some(group_by) = group_by {
                if !explicit.contains(&group_by) {
                    explicit.push(group_by);
                }
            }
        }

        if !explicit.is_empty() {
            let mut exprs = vec![];
            for field in explicit {
                exprs.push(self.replacer.resolve_field(field, params)?);
            }
            return Ok(exprs.join(", "));
        }

        Ok(self
            .selected()
            .into_iter()
            .filter(|(_, mapping)| !mapping.is_aggregate())
            .map(|(expr, _)| expr)
            .collect::<Vec<_>>()
            .join(", "))
    }

    /// The requested ordering, or the primary key ascending, followed by the
    /// declared ordering of joined collections.
    fn order_by(&self) -> Result<String> {
        let collection = self.collection();

        let mut order: Vec<OrderBy> = if self.options().order_by.is_empty() {
            collection
                .primary_keys()
                .map(|mapping| OrderBy::asc(mapping.path()))
                .collect()
        } else {
            self.options().order_by.clone()
        };

        for mapping in collection.relationships() {
            if !(mapping.is_to_many() && mapping.is_expanded()) {
                continue;
            }

            let declared = mapping
                .relationship
                .as_ref()
                .and_then(|relationship| relationship.order_by.as_ref());

            for item in declared.into_iter().flatten() {
                order.push(OrderBy {
                    property: format!("{}.{}", mapping.path(), item.property),
                    direction: item.direction,
                });
            }
        }

        let mut items = vec![];
        for item in &order {
            let column = self
                .replacer
                .column_for(&item.property)
                .ok_or_else(|| unknown_property(collection, &item.property))?;
            items.push(format!("{column} {}", item.direction.sql()));
        }

        Ok(items.join(", "))
    }
}

fn push_clause(sql: &mut String, keyword: &str, body: &str) {
    if body.is_empty() {
        return;
    }

    sql.push(' ');
    if !keyword.is_empty() {
        sql.push_str(keyword);
        sql.push(' ');
    }
    sql.push_str(body);
}

fn is_inner(mapping: &PropertyMapping) -> bool {
    mapping
        .relationship
        .as_ref()
        .is_some_and(|relationship| relationship.join_type == Some(relmap_core::schema::JoinType::Inner))
}

/// Whether any of `paths` is `path` or lies below it.
fn references(paths: &[&str], path: &str) -> bool {
    paths.iter().any(|referenced| {
        *referenced == path
            || referenced
                .strip_prefix(path)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

fn required<'m>(mapping: &PropertyMapping, value: Option<&'m str>, what: &str) -> Result<&'m str> {
    value.ok_or_else(|| unresolved(mapping, what))
}

fn unresolved(mapping: &PropertyMapping, what: &str) -> Error {
    Error::mapping(
        &mapping.class_name,
        Some(&mapping.property_name),
        format!("{what} not resolved"),
    )
}
