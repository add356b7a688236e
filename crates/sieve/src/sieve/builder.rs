use super::{Shared, Sieve};
use crate::{permissions::PermissionCache, Config, MemoryStore, Result, SchemaOverview, Store};

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

#[derive(Debug, Default)]
pub struct Builder {
    schema: Option<SchemaOverview>,
    store: Option<Arc<dyn Store>>,
    config: Config,
}

impl Builder {
    pub fn schema(&mut self, schema: SchemaOverview) -> &mut Self {
        self.schema = Some(schema);
        self
    }

    /// Where roles, policies and permissions are read from. Defaults to an
    /// empty [`MemoryStore`].
    pub fn store(&mut self, store: Arc<dyn Store>) -> &mut Self {
        self.store = Some(store);
        self
    }

    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    pub fn query_limit_default(&mut self, limit: i64) -> &mut Self {
        self.config.query_limit_default = limit;
        self
    }

    pub fn permission_cache_ttl(&mut self, ttl: Duration) -> &mut Self {
        self.config.permission_cache_ttl = ttl.as_secs();
        self
    }

    pub fn build(&mut self) -> Result<Sieve> {
        let Some(schema) = self.schema.take() else {
            sieve_core::bail!("a schema is required to build the engine");
        };

        let store: Arc<dyn Store> = match self.store.take() {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };

        Ok(Sieve {
            shared: Arc::new(Shared {
                store,
                schema: RwLock::new(Arc::new(schema)),
                cache: PermissionCache::new(self.config.permission_cache_ttl()),
                config: self.config.clone(),
            }),
        })
    }
}
