//! Core traits for the EdgeSync system
//!
//! This module defines the seams between the reconciliation engine and its
//! collaborators.
//!
//! - [`AddressProbe`]: Resolve dynamic sources to addresses
//! - [`CdnAdapter`] / [`DnsAdapter`]: Converge provider-side state
//! - [`ConfigStore`]: Load and persist the configuration snapshot
//! - [`Notifier`]: Deliver service status notifications

pub mod adapter;
pub mod notifier;
pub mod probe;
pub mod store;

pub use adapter::{
    CdnAdapter, CdnAdapterFactory, ConvergeAction, Convergence, DnsAdapter, DnsAdapterFactory,
};
pub use notifier::{Notifier, ServiceKind, ServiceStatus};
pub use probe::AddressProbe;
pub use store::ConfigStore;
