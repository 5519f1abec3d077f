//! Plugin-based adapter registry
//!
//! The registry allows CDN and DNS adapters to be registered dynamically at
//! runtime, keyed by the provider string used in service configuration,
//! avoiding hardcoded if-else chains in the engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use edgesync_core::registry::AdapterRegistry;
//!
//! let registry = AdapterRegistry::new();
//!
//! // Register adapters
//! registry.register_cdn("aliyun", Box::new(aliyun_factory));
//!
//! // Create an adapter for a configured service
//! let adapter = registry.create_cdn("aliyun")?;
//! ```
//!
//! ## Registration
//!
//! Provider crates register themselves during initialization:
//!
//! ```rust,ignore
//! // In edgesync-provider-aliyun
//! pub fn register(registry: &AdapterRegistry) {
//!     registry.register_cdn("aliyun", Box::new(AliyunCdnFactory::new()));
//!     registry.register_dns("alidns", Box::new(AlidnsFactory::new()));
//! }
//! ```

use crate::error::{Error, Result};
use crate::traits::{CdnAdapter, CdnAdapterFactory, DnsAdapter, DnsAdapterFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of provider adapter factories
///
/// The registry maintains maps of provider keys to factory objects, allowing
/// dynamic instantiation of adapters based on service configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct AdapterRegistry {
    /// Registered CDN adapter factories
    cdn: RwLock<HashMap<String, Box<dyn CdnAdapterFactory>>>,

    /// Registered DNS adapter factories
    dns: RwLock<HashMap<String, Box<dyn DnsAdapterFactory>>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a CDN adapter factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider key (e.g., "aliyun", "baiducloud", "tencent")
    /// - `factory`: Factory object for creating adapter instances
    pub fn register_cdn(&self, name: impl Into<String>, factory: Box<dyn CdnAdapterFactory>) {
        let name = name.into();
        let mut cdn = self.cdn.write().unwrap();
        cdn.insert(name, factory);
    }

    /// Register a DNS adapter factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider key (e.g., "alidns")
    /// - `factory`: Factory object for creating adapter instances
    pub fn register_dns(&self, name: impl Into<String>, factory: Box<dyn DnsAdapterFactory>) {
        let name = name.into();
        let mut dns = self.dns.write().unwrap();
        dns.insert(name, factory);
    }

    /// Create a CDN adapter for a provider key
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn CdnAdapter>)`: Created adapter instance
    /// - `Err(Error)`: If the key is not registered or creation fails
    pub fn create_cdn(&self, name: &str) -> Result<Box<dyn CdnAdapter>> {
        let cdn = self.cdn.read().unwrap();

        let factory = cdn
            .get(name)
            .ok_or_else(|| Error::validation(format!("Unknown CDN provider: {}", name)))?;

        factory.create()
    }

    /// Create a DNS adapter for a provider key
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsAdapter>)`: Created adapter instance
    /// - `Err(Error)`: If the key is not registered or creation fails
    pub fn create_dns(&self, name: &str) -> Result<Box<dyn DnsAdapter>> {
        let dns = self.dns.read().unwrap();

        let factory = dns
            .get(name)
            .ok_or_else(|| Error::validation(format!("Unknown DNS provider: {}", name)))?;

        factory.create()
    }

    /// List all registered CDN provider keys
    pub fn list_cdn(&self) -> Vec<String> {
        let cdn = self.cdn.read().unwrap();
        cdn.keys().cloned().collect()
    }

    /// List all registered DNS provider keys
    pub fn list_dns(&self) -> Vec<String> {
        let dns = self.dns.read().unwrap();
        dns.keys().cloned().collect()
    }

    /// Check if a CDN provider key is registered
    pub fn has_cdn(&self, name: &str) -> bool {
        let cdn = self.cdn.read().unwrap();
        cdn.contains_key(name)
    }

    /// Check if a DNS provider key is registered
    pub fn has_dns(&self, name: &str) -> bool {
        let dns = self.dns.read().unwrap();
        dns.contains_key(name)
    }
}
