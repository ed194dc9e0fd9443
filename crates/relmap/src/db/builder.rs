use super::Db;
use crate::Model;

use relmap_core::{
    provider::ProviderChain, Cache, ClassDescriptor, ClassRegistry, Config, DataTypeHandler,
    DefaultTypeHandler, Error, MappingProvider, ObjectMapper, Result, Storage,
};
use tracing::debug;

use std::sync::Arc;

#[derive(Default)]
pub struct Builder {
    /// Registered classes, in registration order
    classes: Vec<ClassDescriptor>,

    config: Option<Config>,

    /// Metadata sources; attributes declared on the classes by default
    providers: Option<ProviderChain>,

    handler: Option<Arc<dyn DataTypeHandler>>,

    cache: Option<Arc<dyn Cache>>,
}

impl Builder {
    pub fn register<M: Model>(&mut self) -> &mut Self {
        self.classes.push(M::descriptor());
        self
    }

    /// Registers a class that has no typed model.
    pub fn class(&mut self, class: ClassDescriptor) -> &mut Self {
        self.classes.push(class);
        self
    }

    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = Some(config);
        self
    }

    /// Adds a metadata source consulted after the ones added before it.
    pub fn provider(&mut self, provider: impl MappingProvider + 'static) -> &mut Self {
        let chain = self.providers.take().unwrap_or_default();
        self.providers = Some(chain.with(provider));
        self
    }

    pub fn type_handler(&mut self, handler: impl DataTypeHandler + 'static) -> &mut Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Caches resolved mapping collections across handles.
    pub fn cache(&mut self, cache: Arc<dyn Cache>) -> &mut Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the handle and resolves the mapping of every registered class,
    /// so mapping errors surface here rather than on first use.
    pub fn build(&mut self, storage: impl Storage + 'static) -> Result<Db> {
        let mut registry = ClassRegistry::new();
        for class in self.classes.drain(..) {
            if registry.contains(&class.name) {
                return Err(Error::config(
                    "classes",
                    format!("class `{}` is registered more than once", class.name),
                ));
            }
            registry.register(class);
        }

        let names: Vec<String> = registry.iter().map(|class| class.name.clone()).collect();
        let config = Arc::new(self.config.take().unwrap_or_default());
        let providers = self.providers.take().unwrap_or_default();

        let mut mapper = ObjectMapper::new(config, Arc::new(registry), Arc::new(providers));
        if let Some(cache) = self.cache.take() {
            mapper = mapper.with_cache(cache);
        }

        let handler: Arc<dyn DataTypeHandler> = match self.handler.take() {
            Some(handler) => handler,
            None => Arc::new(DefaultTypeHandler),
        };

        let db = Db::new(mapper, handler, Box::new(storage));
        for name in &names {
            db.collection(name)?;
        }
        debug!(classes = names.len(), "built database handle");

        Ok(db)
    }
}
