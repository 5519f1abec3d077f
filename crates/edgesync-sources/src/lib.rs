// # EdgeSync Address Sources
//
// Local address discovery strategies for the EdgeSync engine.
//
// ## Strategies
//
// - [`UrlProbe`]: fetch comma-separated probe URLs in order and extract the
//   first address of the requested family from a response body
// - [`InterfaceProbe`]: read an address off a named network interface
// - [`CommandProbe`]: run a shell command and extract an address from its
//   combined output
//
// All three implement `AddressProbe` from edgesync-core and are wired into
// a [`Resolver`] by [`standard_resolver`]. Per-cycle caching lives in the
// resolver; strategies stay single-shot.

mod command;
mod interface;
mod url;

pub use command::CommandProbe;
pub use interface::InterfaceProbe;
pub use url::UrlProbe;

use edgesync_core::{Resolver, Result};

/// Builds a [`Resolver`] wired with the three standard strategies.
pub fn standard_resolver() -> Result<Resolver> {
    Ok(Resolver::new(
        Box::new(UrlProbe::new()?),
        Box::new(InterfaceProbe::new()),
        Box::new(CommandProbe::new()),
    ))
}
