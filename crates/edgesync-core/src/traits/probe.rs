// # Address Probe Trait
//
// Defines the interface for resolving one dynamic source to an address.
//
// ## Implementations
//
// - URL, interface and command probes: `edgesync-sources` crate
//
// ## Usage
//
// ```rust,ignore
// use edgesync_core::{AddressFamily, AddressProbe};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let probe = /* AddressProbe implementation */;
//
//     let addr = probe
//         .probe(AddressFamily::V4, "https://example.com/ip", None)
//         .await?;
//     println!("observed {addr}");
//
//     Ok(())
// }
// ```

use crate::source::AddressFamily;
use async_trait::async_trait;

/// Trait for dynamic address resolution strategies
///
/// One implementation exists per strategy (URL fetch, interface scan, shell
/// command); the resolver selects the strategy from the source kind and owns
/// the per-cycle cache in front of it.
///
/// # Responsibilities
///
/// Probes are single-shot observers:
/// - Perform exactly one live lookup per call
/// - No retries, no backoff (cadence is owned by the engine)
/// - No caching (owned by the resolver's Cycle Cache)
/// - Report failure as an error, never panic
#[async_trait]
pub trait AddressProbe: Send + Sync {
    /// Resolve one dynamic source to an address string
    ///
    /// # Parameters
    ///
    /// - `family`: which address family to extract
    /// - `value`: strategy-specific input (a URL, an interface name, or a
    ///   shell command)
    /// - `pattern`: optional regular expression narrowing interface
    ///   selection; strategies with no use for it ignore it
    ///
    /// # Returns
    ///
    /// The first address of the requested family found by the strategy, or
    /// a resolution error when nothing matched.
    async fn probe(
        &self,
        family: AddressFamily,
        value: &str,
        pattern: Option<&str>,
    ) -> Result<String, crate::Error>;

    /// Strategy name (for logging/debugging)
    fn strategy_name(&self) -> &'static str;
}
