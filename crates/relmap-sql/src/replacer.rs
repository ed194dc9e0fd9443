//! Resolves property paths inside free-form SQL and moves literal values
//! into bound parameters.

use crate::serializer::Params;

use indexmap::IndexMap;
use relmap_core::{DataTypeHandler, Error, MappingCollection, PropertyMapping, Result, Value};

/// Marks a property path in raw SQL: `%contact.lastName%`
pub const PROPERTY_MARKER: char = '%';

pub const IDENTIFIER_QUOTE: char = '`';

pub const STRING_QUOTE: char = '\'';

const DELIMITERS: [char; 3] = [PROPERTY_MARKER, IDENTIFIER_QUOTE, STRING_QUOTE];

/// Turns caller-supplied SQL fragments and field names into SQL that only
/// references columns and placeholders.
///
/// A free-form field is resolved in this order:
///
/// 1. A string holding at least two unescaped occurrences of one delimiter
///    (`%`, `` ` `` or `'`) is already resolved and is only post-processed.
/// 2. `alias.property`, where `alias` names a join declared by the query,
///    resolves against that join's class.
/// 3. A property path of the root class resolves to its column.
/// 4. Anything else is a literal: it is escaped, quoted and then bound.
///
/// Post-processing replaces `%path%` tokens with columns and every quoted
/// literal with a numbered placeholder, so no value ends up inline.
#[derive(Debug)]
pub struct SqlStringReplacer<'a> {
    collection: &'a MappingCollection,
    joins: IndexMap<String, &'a MappingCollection>,
    handler: &'a dyn DataTypeHandler,
}

impl<'a> SqlStringReplacer<'a> {
    pub fn new(collection: &'a MappingCollection, handler: &'a dyn DataTypeHandler) -> SqlStringReplacer<'a> {
        SqlStringReplacer {
            collection,
            joins: IndexMap::new(),
            handler,
        }
    }

    /// Declares a join to `collection`'s class under `alias`.
    pub fn with_join(mut self, alias: impl Into<String>, collection: &'a MappingCollection) -> SqlStringReplacer<'a> {
        self.joins.insert(alias.into(), collection);
        self
    }

    pub fn collection(&self) -> &'a MappingCollection {
        self.collection
    }

    pub fn handler(&self) -> &'a dyn DataTypeHandler {
        self.handler
    }

    /// Finds the mapping for a root property path, or for `alias.property`
    /// on a declared join. The second element is the join alias.
    pub fn lookup(&self, path: &str) -> Option<(&'a PropertyMapping, Option<&str>)> {
        if let Some((prefix, rest)) = path.split_once('.') {
            if let Some((alias, joined)) = self.joins.get_key_value(prefix) {
                return joined
                    .get(rest)
                    .filter(|mapping| mapping.is_root())
                    .map(|mapping| (mapping, Some(alias.as_str())));
            }
        }

        self.collection.get(path).map(|mapping| (mapping, None))
    }

    /// The SQL expression selecting the property at `path`, if it is mapped
    /// to a column.
    pub fn column_for(&self, path: &str) -> Option<String> {
        let (mapping, join_alias) = self.lookup(path)?;

        match join_alias {
            Some(alias) => mapping
                .short_column_name()
                .map(|column| format!("`{alias}`.`{column}`")),
            None => column_expression(mapping),
        }
    }

    /// Parallel lists of `%path%` tokens and their column replacements.
    pub fn replacements<'p>(
        &self,
        paths: impl IntoIterator<Item = &'p str>,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut find = vec![];
        let mut replace = vec![];

        for path in paths {
            let column = self
                .column_for(path)
                .ok_or_else(|| unknown_property(self.collection, path))?;
            find.push(format!("{PROPERTY_MARKER}{path}{PROPERTY_MARKER}"));
            replace.push(column);
        }

        Ok((find, replace))
    }

    /// Replaces every `%path%` token in `sql` with its column.
    pub fn replace_tokens(&self, sql: &str) -> Result<String> {
        let paths = property_tokens(sql);
        let (find, replace) = self.replacements(paths.iter().map(String::as_str))?;

        let mut sql = sql.to_string();
        for (token, column) in find.iter().zip(&replace) {
            sql = sql.replace(token.as_str(), column);
        }
        Ok(sql)
    }

    /// Post-processes a raw SQL fragment: literals become placeholders and
    /// `%path%` tokens become columns.
    pub fn resolve_sql(&self, sql: &str, params: &mut impl Params) -> Result<String> {
        let sql = extract_literals(sql, params)?;
        self.replace_tokens(&sql)
    }

    /// Resolves a free-form field to a column or a bound literal.
    pub fn resolve_field(&self, field: &str, params: &mut impl Params) -> Result<String> {
        if is_delimited(field) {
            return self.resolve_sql(field, params);
        }

        if let Some(column) = self.column_for(field.trim()) {
            return Ok(column);
        }

        let literal = delimit(&escape(field), STRING_QUOTE);
        extract_literals(&literal, params)
    }
}

/// The SQL selecting a mapped property: its qualified column, or for an
/// aggregate the function applied to its source column.
pub fn column_expression(mapping: &PropertyMapping) -> Option<String> {
    if let (Some(source), Some(column)) = (&mapping.aggregate_source, &mapping.column) {
        let function = column.aggregate.as_ref().map(|agg| agg.function.as_str())?;
        let argument = if source.column == "*" {
            "*".to_string()
        } else {
            format!("`{}`.`{}`", source.table_alias, source.column)
        };
        return Some(format!("{function}({argument})"));
    }

    mapping.full_column_name()
}

pub(crate) fn unknown_property(collection: &MappingCollection, path: &str) -> Error {
    Error::query(format!(
        "`{path}` is not a mapped property of {}",
        collection.class_name()
    ))
}

/// Whether `value` holds at least two unescaped occurrences of any single
/// delimiter.
pub fn is_delimited(value: &str) -> bool {
    DELIMITERS.iter().any(|delimiter| {
        let mut count = 0;
        let mut escaped = false;
        for c in value.chars() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == *delimiter {
                count += 1;
            }
        }
        count >= 2
    })
}

/// Escapes backslashes and single quotes.
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Wraps `value` in `delimiter`, removing an existing pair first so that
/// delimiting twice is the same as delimiting once.
pub fn delimit(value: &str, delimiter: char) -> String {
    let inner = value
        .strip_prefix(delimiter)
        .and_then(|rest| rest.strip_suffix(delimiter))
        .unwrap_or(value);
    format!("{delimiter}{inner}{delimiter}")
}

/// Replaces every single-quoted literal outside of identifiers with a bound
/// placeholder holding the unescaped literal.
pub fn extract_literals(sql: &str, params: &mut impl Params) -> Result<String> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_identifier = false;

    while let Some(c) = chars.next() {
        match c {
            IDENTIFIER_QUOTE => {
                in_identifier = !in_identifier;
                out.push(c);
            }
            STRING_QUOTE if !in_identifier => {
                let mut literal = String::new();
                let mut closed = false;

                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(next) = chars.next() {
                                literal.push(next);
                            }
                        }
                        STRING_QUOTE if chars.peek() == Some(&STRING_QUOTE) => {
                            chars.next();
                            literal.push(STRING_QUOTE);
                        }
                        STRING_QUOTE => {
                            closed = true;
                            break;
                        }
                        c => literal.push(c),
                    }
                }

                if !closed {
                    return Err(Error::query(format!(
                        "unterminated string literal in `{sql}`"
                    )));
                }

                let placeholder = params.push(Value::String(literal));
                out.push(':');
                out.push_str(&placeholder.name());
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Property paths wrapped in `%`, in order of appearance, without
/// duplicates.
pub fn property_tokens(sql: &str) -> Vec<String> {
    let mut tokens: Vec<String> = vec![];
    let mut rest = sql;

    while let Some(start) = rest.find(PROPERTY_MARKER) {
        let after = &rest[start + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(after.len());

        if len > 0 && after[len..].starts_with(PROPERTY_MARKER) {
            let path = &after[..len];
            if !tokens.iter().any(|token| token == path) {
                tokens.push(path.to_string());
            }
            rest = &after[len + 1..];
        } else {
            rest = after;
        }
    }

    tokens
}
