use crate::{Db, Field, Object, ObjectBinder};

use relmap_core::{
    criteria::OrderBy, CriteriaExpression, Error, FindOptions, MappingCollection, Operator,
    PropertyMapping, Result, Row, Value,
};
use relmap_sql::{SelectQueryBuilder, Statement};

use std::rc::Rc;

/// Runs SELECT statements for one root class.
pub(crate) struct ObjectFetcher<'a> {
    db: &'a Db,
    collection: &'a MappingCollection,
}

/// Identifies the children of a relationship that was not joined.
#[derive(Debug, Clone)]
pub(crate) enum Lookup {
    /// Children whose `column` holds `value`
    Column { column: String, value: Value },

    /// Children whose relationship `property` points at `value`
    Property { property: String, value: Value },

    /// Children linked to `value` through a join table
    Linked {
        table: String,
        source: String,
        target: String,
        child_key: String,
        value: Value,
    },
}

impl<'a> ObjectFetcher<'a> {
    pub(crate) fn new(db: &'a Db, collection: &'a MappingCollection) -> ObjectFetcher<'a> {
        ObjectFetcher { db, collection }
    }

    pub(crate) fn statement(&self, options: &FindOptions) -> Result<Statement> {
        let joined = options
            .joins
            .iter()
            .map(|join| Ok((join.alias.clone(), self.db.collection(&join.class)?)))
            .collect::<Result<Vec<(String, Rc<MappingCollection>)>>>()?;

        let mut builder = SelectQueryBuilder::new(self.collection, options, self.db.handler());
        for (alias, collection) in &joined {
            builder = builder.join_collection(alias.as_str(), &**collection);
        }
        builder.build()
    }

    pub(crate) fn rows(&self, options: &FindOptions) -> Result<Vec<Row>> {
        self.db.query(&self.statement(options)?)
    }

    pub(crate) fn objects(&self, options: &FindOptions) -> Result<Vec<Object>> {
        let rows = self.rows(options)?;
        ObjectBinder::new(self.db, self.collection).bind(&rows)
    }

    pub(crate) fn values(&self, options: &FindOptions) -> Result<Vec<Value>> {
        self.db.query_values(&self.statement(options)?)
    }

    pub(crate) fn count(&self, options: &FindOptions) -> Result<u64> {
        let count = self.db.query_value(&self.statement(options)?)?;
        let count = if count.is_null() { 0 } else { count.to_i64()? };
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl Lookup {
    /// The owner key the children are looked up by.
    pub(crate) fn value(&self) -> &Value {
        match self {
            Lookup::Column { value, .. }
            | Lookup::Property { value, .. }
            | Lookup::Linked { value, .. } => value,
        }
    }

    /// Loads the children of `class` the lookup identifies.
    pub(crate) fn load(
        &self,
        db: &Db,
        class: &str,
        to_many: bool,
        order_by: &[OrderBy],
    ) -> Result<Field> {
        let collection = db.collection(class)?;

        let criteria = match self {
            Lookup::Column { column, value } => {
                let property = column_property(&collection, &[], column)
                    .ok_or_else(|| unmapped_column(&collection, column))?;
                CriteriaExpression::eq(property.path(), value.clone())
            }
            Lookup::Property { property, value } => {
                CriteriaExpression::eq(property.as_str(), value.clone())
            }
            Lookup::Linked {
                table,
                source,
                target,
                child_key,
                value,
            } => {
                let keys = linked_keys(db, table, source, target, value)?;
                if keys.is_empty() {
                    return Ok(empty(to_many));
                }
                let property = column_property(&collection, &[], child_key)
                    .ok_or_else(|| unmapped_column(&collection, child_key))?;
                CriteriaExpression::new(property.path(), Operator::In, Value::List(keys))
            }
        };

        let mut options = FindOptions::new().filter(criteria);
        options.order_by = order_by.to_vec();

        let objects = ObjectFetcher::new(db, &collection).objects(&options)?;
        if to_many {
            Ok(Field::Collection(objects))
        } else {
            Ok(Field::Object(objects.into_iter().next()))
        }
    }
}

/// Keys on the child side of the join table rows that reference `value`.
pub(crate) fn linked_keys(
    db: &Db,
    table: &str,
    source: &str,
    target: &str,
    value: &Value,
) -> Result<Vec<Value>> {
    let mut params = relmap_core::Params::new();
    params.insert("param_1".to_string(), value.clone().into_key_value());

    let statement = Statement::new(
        format!("SELECT `{target}` FROM `{table}` WHERE `{source}` = :param_1"),
        params,
    );
    db.query_values(&statement)
}

/// The mapping of the object at `parents` stored in `column`.
pub(crate) fn column_property<'c>(
    collection: &'c MappingCollection,
    parents: &[String],
    column: &str,
) -> Option<&'c PropertyMapping> {
    collection
        .iter()
        .filter(|mapping| mapping.parents == parents && mapping.is_column())
        .find(|mapping| mapping.short_column_name() == Some(column))
}

fn unmapped_column(collection: &MappingCollection, column: &str) -> Error {
    Error::mapping(
        collection.class_name(),
        None,
        format!("no property is mapped to column `{column}`"),
    )
}

fn empty(to_many: bool) -> Field {
    if to_many {
        Field::Collection(vec![])
    } else {
        Field::Object(None)
    }
}
