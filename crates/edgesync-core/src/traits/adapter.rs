// # Provider Adapter Traits
//
// Defines the interface for converging remote provider state (CDN origin
// configurations and DNS records) with locally observed addresses.
//
// ## Implementations
//
// - Aliyun CDN/DCDN/ESA and alidns: `edgesync-provider-aliyun` crate
// - Baidu CDN/DRCDN: `edgesync-provider-baidu` crate
// - Tencent CDN/EdgeOne: `edgesync-provider-tencent` crate
//
// ## Usage
//
// ```rust,ignore
// use edgesync_core::CdnAdapter;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let adapter = /* CdnAdapter implementation */;
//
//     adapter.validate(&service)?;
//     let outcome = adapter.converge(&service, &resolved).await?;
//     println!("{:?} (alias: {:?})", outcome.action, outcome.alias);
//
//     Ok(())
// }
// ```

use crate::config::{CdnService, DnsService};
use crate::resolve::ResolvedValues;
use async_trait::async_trait;

/// Which remote operation a convergence ended up issuing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeAction {
    /// The resource did not exist and was created
    Created,
    /// The resource existed and was modified in place
    Modified,
}

/// Result of a successful convergence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    /// The remote operation that was issued
    pub action: ConvergeAction,
    /// Provider-assigned alias (CNAME) learned during the call, if any
    pub alias: Option<String>,
}

impl Convergence {
    pub fn created(alias: Option<String>) -> Self {
        Self {
            action: ConvergeAction::Created,
            alias,
        }
    }

    pub fn modified(alias: Option<String>) -> Self {
        Self {
            action: ConvergeAction::Modified,
            alias,
        }
    }
}

/// Trait for CDN provider adapters
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Responsibilities
///
/// Adapters are isolated, single-shot integrations:
/// - Perform API calls against their own provider endpoints only
/// - Describe, then create or modify; one convergence per invocation
/// - Return success or failure (the engine owns retry cadence)
/// - Never decide *whether* to update (owned by the drift state)
/// - Never persist configuration (owned by the engine and its store)
#[async_trait]
pub trait CdnAdapter: Send + Sync {
    /// Validate the service descriptor before any remote call
    ///
    /// Checks credentials, domain, variant support and that at least one
    /// source is configured. A validation failure is terminal for this
    /// service for the current cycle.
    fn validate(&self, service: &CdnService) -> Result<(), crate::Error>;

    /// Converge the remote origin configuration with the resolved values
    ///
    /// Issues an idempotent describe call, then a create call when the
    /// accelerated domain is absent or a modify call when present. Returns
    /// the action taken plus any alias learned from the describe response.
    async fn converge(
        &self,
        service: &CdnService,
        resolved: &ResolvedValues,
    ) -> Result<Convergence, crate::Error>;

    /// Provider key this adapter serves (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Trait for DNS provider adapters
///
/// Same contract as [`CdnAdapter`] with a single resolved record value
/// instead of per-origin values; DNS providers assign no alias.
#[async_trait]
pub trait DnsAdapter: Send + Sync {
    /// Validate the service descriptor before any remote call
    fn validate(&self, service: &DnsService) -> Result<(), crate::Error>;

    /// Converge the remote record with the resolved value
    ///
    /// Describes the record set, then adds the record when absent or
    /// updates it in place when the stored value differs.
    async fn converge(
        &self,
        service: &DnsService,
        value: &str,
    ) -> Result<Convergence, crate::Error>;

    /// Provider key this adapter serves (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing CDN adapters
///
/// Credentials travel with each service descriptor, so factories take no
/// configuration; they exist to defer client construction to first use.
pub trait CdnAdapterFactory: Send + Sync {
    /// Create a CdnAdapter instance
    fn create(&self) -> Result<Box<dyn CdnAdapter>, crate::Error>;
}

/// Helper trait for constructing DNS adapters
pub trait DnsAdapterFactory: Send + Sync {
    /// Create a DnsAdapter instance
    fn create(&self) -> Result<Box<dyn DnsAdapter>, crate::Error>;
}
