//! Source resolution with a per-cycle cache
//!
//! The [`Resolver`] turns a [`SourceTarget`] into an address string. Static
//! sources pass through verbatim; dynamic sources go to one of three probe
//! strategies (URL, interface, command) behind a cache that is cleared at
//! the start of every reconciliation cycle, so each distinct source identity
//! is probed at most once per cycle no matter how many services share it.

use crate::source::{SourceKey, SourceKind, SourceTarget};
use crate::traits::AddressProbe;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cycle-scoped source resolver
pub struct Resolver {
    url: Box<dyn AddressProbe>,
    interface: Box<dyn AddressProbe>,
    command: Box<dyn AddressProbe>,
    cache: RwLock<HashMap<SourceKey, String>>,
}

impl Resolver {
    pub fn new(
        url: Box<dyn AddressProbe>,
        interface: Box<dyn AddressProbe>,
        command: Box<dyn AddressProbe>,
    ) -> Self {
        Self {
            url,
            interface,
            command,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Drop all cached values (start of a cycle)
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Resolve one source to its current value
    ///
    /// Static sources return their configured value directly and never
    /// touch the cache. Dynamic sources hit the cache first; a live probe
    /// runs only on a miss, and a failed probe leaves the cache cold for
    /// that identity.
    pub async fn resolve(&self, target: &SourceTarget) -> Result<String, crate::Error> {
        if !target.kind.is_dynamic() {
            return Ok(target.value.clone());
        }

        let key = target.key();
        {
            let cache = self.cache.read().await;
            if let Some(hit) = cache.get(&key) {
                return Ok(hit.clone());
            }
        }

        let value = self.probe(target).await?;
        self.cache.write().await.insert(key, value.clone());
        Ok(value)
    }

    async fn probe(&self, target: &SourceTarget) -> Result<String, crate::Error> {
        let family = target.kind.family().ok_or_else(|| {
            crate::Error::resolution(format!(
                "source kind '{}' carries no address family",
                target.kind
            ))
        })?;

        let probe: &dyn AddressProbe = match target.kind {
            SourceKind::DynamicIpv4Url | SourceKind::DynamicIpv6Url => self.url.as_ref(),
            SourceKind::DynamicIpv4Interface | SourceKind::DynamicIpv6Interface => {
                self.interface.as_ref()
            }
            SourceKind::DynamicIpv4Command | SourceKind::DynamicIpv6Command => {
                self.command.as_ref()
            }
            SourceKind::Ipv4 | SourceKind::Ipv6 | SourceKind::Domain => {
                return Err(crate::Error::resolution(format!(
                    "source kind '{}' is not dynamic",
                    target.kind
                )));
            }
        };

        probe
            .probe(family, &target.value, target.regex.as_deref())
            .await
    }
}

/// Resolved values for one service's sources, keyed by source identity
///
/// Built by the engine before a convergence and handed to the CDN adapter,
/// which looks values up per configured source.
#[derive(Debug, Clone, Default)]
pub struct ResolvedValues {
    values: HashMap<SourceKey, String>,
}

impl ResolvedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SourceKey, value: String) {
        self.values.insert(key, value);
    }

    /// Value for a source, if it was resolved this cycle
    pub fn value_for(&self, target: &SourceTarget) -> Option<&str> {
        self.values.get(&target.key()).map(String::as_str)
    }

    /// Value for a source with the configured value as fallback
    ///
    /// Static sources always use their configured value. A dynamic source
    /// missing from the map falls back to its configured value with a
    /// warning.
    pub fn value_or_configured<'a>(&'a self, target: &'a SourceTarget) -> &'a str {
        if target.kind.is_dynamic() {
            if let Some(value) = self.value_for(target) {
                return value;
            }
            tracing::warn!(
                "No resolved value for dynamic source {}, using configured value",
                target.key()
            );
        }
        &target.value
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
