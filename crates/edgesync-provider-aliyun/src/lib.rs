// # Aliyun Provider
//
// Adapters for Aliyun's acceleration products (CDN, DCDN, ESA) and its
// authoritative DNS (alidns). All of them authenticate with the signed
// query-parameter scheme from `edgesync_signing::aliyun`.
//
// ## Provider keys
//
// - `aliyun` — CDN section, variants `cdn` / `dcdn` / `esa`
// - `alidns` — DNS section

mod cdn;
mod dns;

pub use cdn::{AliyunCdn, AliyunCdnFactory};
pub use dns::{Alidns, AlidnsFactory};

use edgesync_core::AdapterRegistry;

/// Register the Aliyun adapters with a registry
///
/// # Example
///
/// ```rust
/// use edgesync_core::AdapterRegistry;
///
/// let registry = AdapterRegistry::new();
/// edgesync_provider_aliyun::register(&registry);
/// assert!(registry.has_cdn("aliyun"));
/// assert!(registry.has_dns("alidns"));
/// ```
pub fn register(registry: &AdapterRegistry) {
    registry.register_cdn("aliyun", Box::new(AliyunCdnFactory));
    registry.register_dns("alidns", Box::new(AlidnsFactory));
}
