// # Memory Config Store
//
// In-memory implementation of ConfigStore.
//
// ## Purpose
//
// Holds the configuration snapshot in process memory with no persistence.
// Useful for tests and for embedding the engine in a host application that
// manages configuration itself.
//
// ## Crash Behavior
//
// - Learned aliases are lost on restart (the next describe call relearns
//   them)
// - No recovery needed; the seeded configuration is the initial state

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::traits::ConfigStore;
use crate::Error;

/// In-memory config store implementation
///
/// Stores one configuration snapshot behind a RwLock. Clones of the store
/// share the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<Config>>,
}

impl MemoryConfigStore {
    /// Create a store seeded with a configuration
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Current snapshot (same as `load`, available without the trait)
    pub async fn snapshot(&self) -> Config {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<Config, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, config: &Config) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        *guard = config.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CdnService, CdnVariant};

    fn service(domain: &str) -> CdnService {
        CdnService {
            id: String::new(),
            name: String::new(),
            domain: domain.to_string(),
            provider: "aliyun".to_string(),
            variant: CdnVariant::Cdn,
            access_key: "ak".to_string(),
            access_secret: "sk".to_string(),
            cname: None,
            sources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn load_returns_the_seeded_snapshot() {
        let mut config = Config::default();
        config.cdn.enabled = true;
        config.cdn.services.push(service("cdn.example.com"));

        let store = MemoryConfigStore::new(config);
        let loaded = store.load().await.unwrap();
        assert!(loaded.cdn.enabled);
        assert_eq!(loaded.cdn.services[0].domain, "cdn.example.com");
    }

    #[tokio::test]
    async fn save_replaces_the_snapshot_for_all_clones() {
        let store = MemoryConfigStore::default();
        let shared = store.clone();

        let mut mutated = store.load().await.unwrap();
        mutated.cdn.services.push(service("a.example.com"));
        store.save(&mutated).await.unwrap();

        assert_eq!(shared.load().await.unwrap().cdn.services.len(), 1);
    }
}
