use super::{join_path, path_alias, AggregateSource, MappingCollection, PropertyMapping, RelationshipTarget};
use crate::cache::Cache;
use crate::class::{ClassDescriptor, ClassRegistry, PropertyDescriptor, PropertyKind};
use crate::naming::NameResolver;
use crate::provider::MappingProvider;
use crate::schema::{fill, Column, Relationship, RelationshipKind};
use crate::{Config, Error, Result};

use std::sync::Arc;
use tracing::{debug, warn};

/// Builds [`MappingCollection`]s from class descriptors.
///
/// Metadata comes from the provider chain, missing names from the name
/// resolver. Eager relationships are expanded recursively until either the
/// same relationship shows up a second time or `max_depth` is reached.
#[derive(Debug)]
pub struct ObjectMapper {
    config: Arc<Config>,
    registry: Arc<ClassRegistry>,
    provider: Arc<dyn MappingProvider>,
    resolver: NameResolver,
    cache: Option<Arc<dyn Cache>>,
}

/// The object being populated: where it sits in the graph and which table
/// holds its columns.
struct Level {
    parents: Vec<String>,
    table: String,
    table_alias: String,
    column_prefix: Option<String>,
}

impl ObjectMapper {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ClassRegistry>,
        provider: Arc<dyn MappingProvider>,
    ) -> ObjectMapper {
        let resolver = config.name_resolver();
        ObjectMapper {
            config,
            registry,
            provider,
            resolver,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> ObjectMapper {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Key under which the mapping of `class` is cached for the current
    /// configuration.
    pub fn cache_key(&self, class: &str) -> String {
        let class: String = class
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("relmap_mapping_{class}_{}", self.config.mapping_hash())
    }

    /// Returns the mapping collection for `class`, from the cache when one
    /// is configured.
    pub fn mapping_collection_for_class(&self, class: &str) -> Result<MappingCollection> {
        let Some(cache) = &self.cache else {
            return self.build(class);
        };

        let key = self.cache_key(class);
        if let Some(json) = cache.get(&key)? {
            match serde_json::from_str(&json) {
                Ok(collection) => {
                    debug!(class, %key, "mapping cache hit");
                    return Ok(collection);
                }
                Err(err) => warn!(class, %key, %err, "discarding unreadable cached mapping"),
            }
        } else {
            debug!(class, %key, "mapping cache miss");
        }

        let collection = self.build(class)?;
        cache.set(&key, serde_json::to_string(&collection)?, None)?;
        Ok(collection)
    }

    fn build(&self, class: &str) -> Result<MappingCollection> {
        let descriptor = self.class(class)?;
        let table = self.table_name(&descriptor);
        let mut collection = MappingCollection::new(&descriptor.name, &table);

        let level = Level {
            parents: vec![],
            table: table.clone(),
            table_alias: table,
            column_prefix: None,
        };
        self.populate(&mut collection, &descriptor, &level, 0)?;

        Ok(collection)
    }

    fn class(&self, name: &str) -> Result<Arc<ClassDescriptor>> {
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| Error::mapping(name, None, "class is not registered"))
    }

    /// Physical table of a class.
    pub fn table_name(&self, class: &ClassDescriptor) -> String {
        self.provider
            .table_mapping(class)
            .and_then(|table| table.name)
            .unwrap_or_else(|| self.resolver.table_name(&class.name))
    }

    /// The primary key property of a class and its column. Without explicit
    /// metadata and with guessing enabled, a property named `id` is the key.
    pub fn primary_key(&self, class: &ClassDescriptor) -> Option<(String, String)> {
        for property in &class.properties {
            if let Some(column) = self.provider.column_mapping(class, property) {
                if column.is_primary_key() {
                    let name = column
                        .name
                        .unwrap_or_else(|| self.resolver.column_name(&property.name, None));
                    return Some((property.name.clone(), name));
                }
            }
        }

        if !self.config.guess_mappings() {
            return None;
        }

        class
            .get_property("id")
            .filter(|property| property.kind == PropertyKind::Scalar)
            .map(|property| {
                let name = self
                    .provider
                    .column_mapping(class, property)
                    .and_then(|column| column.name)
                    .unwrap_or_else(|| self.resolver.column_name(&property.name, None));
                (property.name.clone(), name)
            })
    }

    fn populate(
        &self,
        collection: &mut MappingCollection,
        class: &ClassDescriptor,
        level: &Level,
        depth: usize,
    ) -> Result<()> {
        let primary_key = self.primary_key(class);

        for property in &class.properties {
            let mapping = match self.map_property(class, property, level, primary_key.as_ref()) {
                Ok(Some(mapping)) => mapping,
                Ok(None) => continue,
                Err(err) if err.is_mapping() && !self.config.strict_mapping() => {
                    warn!(class = %class.name, property = %property.name, %err, "recording mapping error");
                    collection.record_error(err.to_string());
                    continue;
                }
                Err(err) => return Err(err),
            };

            self.push(collection, mapping, depth)?;
        }

        Ok(())
    }

    /// Adds a mapping and, for relationships that should be joined, the
    /// mappings of the child class.
    fn push(
        &self,
        collection: &mut MappingCollection,
        mut mapping: PropertyMapping,
        depth: usize,
    ) -> Result<()> {
        let expand = match (&mapping.relationship, &mapping.target) {
            (Some(rel), Some(target)) if !rel.is_scalar() => {
                let eager = rel.is_embedded() || !rel.is_lazy();
                let within_depth = depth < self.config.max_depth();
                let key = format!(
                    "{}.{}:{}",
                    mapping.class_name,
                    mapping.property_name,
                    target.class_name.as_deref().unwrap_or_default()
                );

                if eager && within_depth && collection.mark_relationship(key.clone(), mapping.path()) {
                    true
                } else {
                    if eager {
                        debug!(%key, depth, "relationship not expanded again; loading lazily");
                    }
                    false
                }
            }
            _ => false,
        };

        if mapping.is_relationship() {
            if let Some(target) = mapping.target.as_mut() {
                target.expanded = expand;
            }
        }

        let child = mapping.target.as_ref().map(|target| {
            let level = Level {
                parents: mapping.child_parents(),
                table: target.table.clone(),
                table_alias: target.alias.clone(),
                column_prefix: mapping
                    .relationship
                    .as_ref()
                    .filter(|rel| rel.is_embedded())
                    .map(|rel| rel.column_prefix.clone().unwrap_or_default()),
            };
            (target.class_name.clone(), level)
        });
        collection.push(mapping);

        if let Some((Some(child_class), level)) = child.filter(|_| expand) {
            let child = self.class(&child_class)?;
            self.populate(collection, &child, &level, depth + 1)?;
        }

        Ok(())
    }

    fn map_property(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
        level: &Level,
        primary_key: Option<&(String, String)>,
    ) -> Result<Option<PropertyMapping>> {
        let mut column = self.provider.column_mapping(class, property);
        let mut relationship = self
            .provider
            .relationship_mapping(class, property);

        if column.is_none() && relationship.is_none() {
            if !self.config.guess_mappings() {
                return Ok(None);
            }

            match &property.kind {
                PropertyKind::Scalar => column = Some(Column::default()),
                PropertyKind::Object(child) => relationship = Some(Relationship::many_to_one(child)),
                PropertyKind::Collection(child) => {
                    return Err(Error::mapping(
                        &class.name,
                        Some(property.name.as_str()),
                        format!("collection of `{child}` has no mapped_by property to join on"),
                    ))
                }
            }
        }

        let mut mapping = PropertyMapping::new(&class.name, &property.name, level.parents.clone());
        mapping.table_alias = level.table_alias.clone();

        if let Some(mut relationship) = relationship {
            self.infer_kind(class, property, &mut relationship)?;

            if relationship.is_scalar() {
                let column = column.get_or_insert_with(Column::default);
                self.resolve_scalar_join(class, property, level, &mut relationship, column, &mut mapping)?;
            } else {
                let target =
                    self.resolve_relationship(class, property, level, primary_key, &mut relationship)?;
                mapping.target = Some(target);
            }

            mapping.relationship = Some(relationship);
        }

        if let Some(mut column) = column {
            if !mapping.is_relationship() {
                if column.name.is_none() {
                    column.name = Some(self.resolver.column_name(&property.name, Some(&mapping)));
                }

                if !mapping.is_scalar_join() {
                    if let Some(prefix) = &level.column_prefix {
                        column.name = Some(format!("{prefix}{}", column.name()));
                    }

                    if column.primary_key.is_none()
                        && primary_key.is_some_and(|(pk, _)| *pk == property.name)
                    {
                        column.primary_key = Some(true);
                    }
                }

                if let Some(aggregate) = &column.aggregate {
                    mapping.aggregate_source = Some(self.resolve_aggregate(
                        class,
                        property,
                        level,
                        &aggregate.collection_property,
                        &aggregate.property,
                    )?);
                }

                mapping.column = Some(column);
            }
        }

        Ok(Some(mapping))
    }

    /// Fills in the relationship kind when metadata leaves it unset.
    fn infer_kind(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
        relationship: &mut Relationship,
    ) -> Result<()> {
        if relationship.is_defined() {
            return Ok(());
        }

        relationship.kind = Some(match &property.kind {
            PropertyKind::Object(_) if relationship.mapped_by.is_some() => RelationshipKind::OneToOne,
            PropertyKind::Object(_) => RelationshipKind::ManyToOne,
            PropertyKind::Collection(_) if relationship.join_table.is_some() => {
                RelationshipKind::ManyToMany
            }
            PropertyKind::Collection(_) => RelationshipKind::OneToMany,
            PropertyKind::Scalar if relationship.join_table.is_some() => RelationshipKind::Scalar,
            PropertyKind::Scalar => {
                return Err(Error::mapping(
                    &class.name,
                    Some(property.name.as_str()),
                    "relationship kind is not declared",
                ))
            }
        });

        Ok(())
    }

    fn resolve_relationship(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
        level: &Level,
        primary_key: Option<&(String, String)>,
        relationship: &mut Relationship,
    ) -> Result<RelationshipTarget> {
        let mapping_error = |message: String| Error::mapping(&class.name, Some(property.name.as_str()), message);

        let child_name = relationship
            .child_class
            .clone()
            .or_else(|| property.class_name().map(str::to_string))
            .ok_or_else(|| mapping_error("relationship declares no child class".to_string()))?;

        let child = self
            .registry
            .get(&child_name)
            .cloned()
            .ok_or_else(|| mapping_error(format!("child class `{child_name}` not found")))?;

        relationship.child_class = Some(child_name.clone());

        if relationship.lazy.is_none() {
            let eager = if relationship.is_to_many() {
                self.config.eager_load_to_many()
            } else {
                self.config.eager_load_to_one()
            };
            relationship.lazy = Some(!eager && !relationship.is_embedded());
        }

        if relationship.collection_class.is_none() && relationship.is_to_many() {
            relationship.collection_class =
                self.config.default_collection_class().map(str::to_string);
        }

        let owner_key = primary_key
            .map(|(_, column)| column.clone())
            .unwrap_or_else(|| "id".to_string());
        let child_key = self.primary_key(&child).map(|(_, column)| column);
        let child_table = self.table_name(&child);
        let path = join_path(&level.parents, &property.name);

        if relationship.is_embedded() {
            return Ok(RelationshipTarget {
                class_name: Some(child_name),
                table: level.table.clone(),
                alias: level.table_alias.clone(),
                link_alias: None,
                owner_key,
                child_key,
                expanded: false,
            });
        }

        let child_key_or_id = child_key.clone().unwrap_or_else(|| "id".to_string());

        match relationship.kind() {
            RelationshipKind::ManyToMany => {
                if let Some(inverse) = self.inverse_relationship(&child, relationship)? {
                    fill(&mut relationship.join_table, inverse.join_table);
                    fill(&mut relationship.source_join_column, inverse.source_join_column);
                    fill(&mut relationship.target_join_column, inverse.target_join_column);
                }
                if relationship.join_table.is_none() {
                    relationship.join_table =
                        Some(self.resolver.join_table_name(&level.table, &child_table));
                }
                if relationship.source_join_column.is_none() {
                    relationship.source_join_column =
                        Some(self.resolver.join_table_column(&level.table, &owner_key));
                }
                if relationship.target_join_column.is_none() {
                    relationship.target_join_column =
                        Some(self.resolver.join_table_column(&child_table, &child_key_or_id));
                }
            }
            _ if relationship.mapped_by.is_some() => {
                if relationship.source_join_column.is_none() {
                    relationship.source_join_column = Some(owner_key.clone());
                }
                if relationship.target_join_column.is_none() {
                    let mapped_by = relationship.mapped_by.clone().unwrap_or_default();
                    let column = match self.inverse_relationship(&child, relationship)? {
                        Some(inverse) => inverse.source_join_column,
                        None => None,
                    };
                    relationship.target_join_column = Some(
                        column.unwrap_or_else(|| self.resolver.foreign_key_column(&mapped_by, &owner_key)),
                    );
                }
            }
            RelationshipKind::OneToMany => {
                return Err(mapping_error(
                    "one-to-many relationship needs a mapped_by property".to_string(),
                ))
            }
            _ => {
                if relationship.source_join_column.is_none() {
                    relationship.source_join_column =
                        Some(self.resolver.foreign_key_column(&property.name, &child_key_or_id));
                }
                if relationship.target_join_column.is_none() {
                    relationship.target_join_column = Some(child_key_or_id.clone());
                }
            }
        }

        let alias = format!("obj_alias_{}", path_alias(&path));
        let link_alias = relationship
            .is_many_to_many()
            .then(|| format!("{alias}_link"));

        Ok(RelationshipTarget {
            class_name: Some(child_name),
            table: child_table,
            alias,
            link_alias,
            owner_key,
            child_key,
            expanded: false,
        })
    }

    /// The relationship on the child named by `mapped_by`, with its join
    /// columns swapped for a many-to-many relationship.
    fn inverse_relationship(
        &self,
        child: &ClassDescriptor,
        relationship: &Relationship,
    ) -> Result<Option<Relationship>> {
        let Some(mapped_by) = relationship.mapped_by.as_deref() else {
            return Ok(None);
        };

        let property = child.get_property(mapped_by).ok_or_else(|| {
            Error::mapping(
                &child.name,
                Some(mapped_by),
                "property named by mapped_by does not exist",
            )
        })?;

        let Some(mut inverse) = self.provider.relationship_mapping(child, property) else {
            return Ok(None);
        };

        if relationship.is_many_to_many() {
            std::mem::swap(
                &mut inverse.source_join_column,
                &mut inverse.target_join_column,
            );
        }

        Ok(Some(inverse))
    }

    fn resolve_scalar_join(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
        level: &Level,
        relationship: &mut Relationship,
        column: &mut Column,
        mapping: &mut PropertyMapping,
    ) -> Result<()> {
        let (Some(join_table), Some(_), Some(_)) = (
            relationship.join_table.clone(),
            relationship.source_join_column.as_ref(),
            relationship.target_join_column.as_ref(),
        ) else {
            return Err(Error::mapping(
                &class.name,
                Some(property.name.as_str()),
                "scalar join needs a join table with source and target columns",
            ));
        };

        if column.name.is_none() {
            column.name = Some(self.resolver.column_name(&property.name, None));
        }

        let path = join_path(&level.parents, &property.name);
        mapping.target = Some(RelationshipTarget {
            class_name: None,
            table: join_table,
            alias: format!("obj_alias_{}", path_alias(&path)),
            link_alias: None,
            owner_key: String::new(),
            child_key: None,
            expanded: true,
        });

        Ok(())
    }

    fn resolve_aggregate(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
        level: &Level,
        collection_property: &str,
        source_property: &str,
    ) -> Result<AggregateSource> {
        let mapping_error = |message: String| Error::mapping(&class.name, Some(property.name.as_str()), message);

        let collection = class.get_property(collection_property).ok_or_else(|| {
            mapping_error(format!("aggregate collection `{collection_property}` does not exist"))
        })?;

        let child_name = self
            .provider
            .relationship_mapping(class, collection)
            .and_then(|rel| rel.child_class)
            .or_else(|| collection.class_name().map(str::to_string))
            .ok_or_else(|| {
                mapping_error(format!("aggregate collection `{collection_property}` has no child class"))
            })?;

        let child = self.registry.get(&child_name).cloned().ok_or_else(|| {
            mapping_error(format!("child class `{child_name}` not found"))
        })?;

        let column = match child.get_property(source_property) {
            Some(source) => self
                .provider
                .column_mapping(&child, source)
                .and_then(|column| column.name)
                .unwrap_or_else(|| self.resolver.column_name(source_property, None)),
            None if source_property == "*" => "*".to_string(),
            None => {
                return Err(mapping_error(format!(
                    "aggregate property `{source_property}` does not exist on `{child_name}`"
                )))
            }
        };

        let relationship_path = join_path(&level.parents, collection_property);
        Ok(AggregateSource {
            table_alias: format!("obj_alias_{}", path_alias(&relationship_path)),
            relationship_path,
            column,
        })
    }
}
