use crate::naming::{NameResolver, NamingConvention};
use crate::{Error, Result};

use heck::ToSnakeCase;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Engine configuration.
///
/// Built once through [`Config::builder`] and shared by every component.
/// A `Config` is never modified after it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    production_mode: bool,
    cache_directory: Option<PathBuf>,
    allow_duplicates: bool,
    eager_load_to_one: bool,
    eager_load_to_many: bool,
    guess_mappings: bool,
    table_naming_strategy: NamingConvention,
    column_naming_strategy: NamingConvention,
    default_collection_class: Option<String>,
    max_depth: usize,
    save_children_by_default: bool,
    disable_delete_relationships: bool,
    disable_delete_entities: bool,
    strict_mapping: bool,
}

/// Options that change generated mappings. Only these feed the mapping hash.
#[derive(Serialize)]
struct MappingOptions<'a> {
    eager_load_to_one: bool,
    eager_load_to_many: bool,
    guess_mappings: bool,
    table_naming_strategy: NamingConvention,
    column_naming_strategy: NamingConvention,
    default_collection_class: Option<&'a str>,
    max_depth: usize,
    strict_mapping: bool,
}

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            production_mode: false,
            cache_directory: None,
            allow_duplicates: false,
            eager_load_to_one: true,
            eager_load_to_many: false,
            guess_mappings: true,
            table_naming_strategy: NamingConvention::SnakeCase,
            column_naming_strategy: NamingConvention::SnakeCase,
            default_collection_class: None,
            max_depth: 10,
            save_children_by_default: true,
            disable_delete_relationships: false,
            disable_delete_entities: false,
            strict_mapping: false,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    pub fn production_mode(&self) -> bool {
        self.production_mode
    }

    pub fn cache_directory(&self) -> Option<&Path> {
        self.cache_directory.as_deref()
    }

    /// Keep duplicate parent rows instead of collapsing them.
    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// Join to-one relationships unless declared lazy.
    pub fn eager_load_to_one(&self) -> bool {
        self.eager_load_to_one
    }

    /// Join to-many relationships unless declared lazy.
    pub fn eager_load_to_many(&self) -> bool {
        self.eager_load_to_many
    }

    /// Map properties that carry no metadata by naming convention.
    pub fn guess_mappings(&self) -> bool {
        self.guess_mappings
    }

    pub fn table_naming_strategy(&self) -> NamingConvention {
        self.table_naming_strategy
    }

    pub fn column_naming_strategy(&self) -> NamingConvention {
        self.column_naming_strategy
    }

    pub fn default_collection_class(&self) -> Option<&str> {
        self.default_collection_class.as_deref()
    }

    /// Maximum number of nested relationships joined below the root.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn save_children_by_default(&self) -> bool {
        self.save_children_by_default
    }

    pub fn disable_delete_relationships(&self) -> bool {
        self.disable_delete_relationships
    }

    pub fn disable_delete_entities(&self) -> bool {
        self.disable_delete_entities
    }

    /// Propagate mapping errors instead of recording them.
    pub fn strict_mapping(&self) -> bool {
        self.strict_mapping
    }

    /// Name resolver using the configured naming strategies.
    pub fn name_resolver(&self) -> NameResolver {
        NameResolver::new(
            self.table_naming_strategy.strategy(),
            self.column_naming_strategy.strategy(),
        )
    }

    /// SHA-256 of the options that affect generated mappings, hex encoded.
    ///
    /// Two configurations with the same hash produce the same mapping for
    /// every class.
    pub fn mapping_hash(&self) -> String {
        let options = MappingOptions {
            eager_load_to_one: self.eager_load_to_one,
            eager_load_to_many: self.eager_load_to_many,
            guess_mappings: self.guess_mappings,
            table_naming_strategy: self.table_naming_strategy,
            column_naming_strategy: self.column_naming_strategy,
            default_collection_class: self.default_collection_class.as_deref(),
            max_depth: self.max_depth,
            strict_mapping: self.strict_mapping,
        };
        let json = serde_json::to_vec(&options).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&json);
        format!("{:x}", hasher.finalize())
    }
}

impl ConfigBuilder {
    pub fn production_mode(mut self, value: bool) -> ConfigBuilder {
        self.config.production_mode = value;
        self
    }

    pub fn cache_directory(mut self, path: impl Into<PathBuf>) -> ConfigBuilder {
        self.config.cache_directory = Some(path.into());
        self
    }

    pub fn allow_duplicates(mut self, value: bool) -> ConfigBuilder {
        self.config.allow_duplicates = value;
        self
    }

    pub fn eager_load_to_one(mut self, value: bool) -> ConfigBuilder {
        self.config.eager_load_to_one = value;
        self
    }

    pub fn eager_load_to_many(mut self, value: bool) -> ConfigBuilder {
        self.config.eager_load_to_many = value;
        self
    }

    pub fn guess_mappings(mut self, value: bool) -> ConfigBuilder {
        self.config.guess_mappings = value;
        self
    }

    pub fn table_naming_strategy(mut self, value: NamingConvention) -> ConfigBuilder {
        self.config.table_naming_strategy = value;
        self
    }

    pub fn column_naming_strategy(mut self, value: NamingConvention) -> ConfigBuilder {
        self.config.column_naming_strategy = value;
        self
    }

    pub fn default_collection_class(mut self, class: impl Into<String>) -> ConfigBuilder {
        self.config.default_collection_class = Some(class.into());
        self
    }

    pub fn max_depth(mut self, value: usize) -> ConfigBuilder {
        self.config.max_depth = value;
        self
    }

    pub fn save_children_by_default(mut self, value: bool) -> ConfigBuilder {
        self.config.save_children_by_default = value;
        self
    }

    pub fn disable_delete_relationships(mut self, value: bool) -> ConfigBuilder {
        self.config.disable_delete_relationships = value;
        self
    }

    pub fn disable_delete_entities(mut self, value: bool) -> ConfigBuilder {
        self.config.disable_delete_entities = value;
        self
    }

    pub fn strict_mapping(mut self, value: bool) -> ConfigBuilder {
        self.config.strict_mapping = value;
        self
    }

    /// Sets an option from its textual name and value, as read from a
    /// configuration file. Names are accepted in snake_case or camelCase.
    pub fn set_option(self, name: &str, value: &str) -> Result<ConfigBuilder> {
        let option = name.trim().to_snake_case();
        let value = value.trim();

        Ok(match option.as_str() {
            "production_mode" => self.production_mode(parse_bool(&option, value)?),
            "cache_directory" => self.cache_directory(value),
            "allow_duplicates" => self.allow_duplicates(parse_bool(&option, value)?),
            "eager_load_to_one" => self.eager_load_to_one(parse_bool(&option, value)?),
            "eager_load_to_many" => self.eager_load_to_many(parse_bool(&option, value)?),
            "guess_mappings" => self.guess_mappings(parse_bool(&option, value)?),
            "table_naming_strategy" => {
                self.table_naming_strategy(parse_convention(&option, value)?)
            }
            "column_naming_strategy" => {
                self.column_naming_strategy(parse_convention(&option, value)?)
            }
            "default_collection_class" => self.default_collection_class(value),
            "max_depth" => {
                let depth = value.parse().map_err(|_| {
                    Error::config(&option, format!("expected a positive integer, got `{value}`"))
                })?;
                self.max_depth(depth)
            }
            "save_children_by_default" => {
                self.save_children_by_default(parse_bool(&option, value)?)
            }
            "disable_delete_relationships" => {
                self.disable_delete_relationships(parse_bool(&option, value)?)
            }
            "disable_delete_entities" => {
                self.disable_delete_entities(parse_bool(&option, value)?)
            }
            "strict_mapping" => self.strict_mapping(parse_bool(&option, value)?),
            _ => return Err(Error::config(name, "unknown option")),
        })
    }

    /// Validates the options and returns the configuration.
    pub fn build(self) -> Result<Config> {
        let config = self.config;

        if config.max_depth == 0 {
            return Err(Error::config("max_depth", "must be at least 1"));
        }

        if let Some(dir) = &config.cache_directory {
            if !dir.is_dir() {
                return Err(Error::config(
                    "cache_directory",
                    format!("`{}` is not an existing directory", dir.display()),
                ));
            }
        }

        Ok(config)
    }
}

fn parse_bool(option: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::config(
            option,
            format!("expected a boolean, got `{value}`"),
        )),
    }
}

fn parse_convention(option: &str, value: &str) -> Result<NamingConvention> {
    NamingConvention::parse(value).ok_or_else(|| {
        Error::config(
            option,
            format!("unknown naming strategy `{value}`; expected `snake_case` or `as_is`"),
        )
    })
}
