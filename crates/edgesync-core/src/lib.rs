// # edgesync-core
//
// Core library for the EdgeSync reconciliation system.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping CDN origin
// configurations and DNS records converged with locally observed addresses:
// - **AddressProbe**: Trait for resolving dynamic sources (URL, interface, command)
// - **CdnAdapter / DnsAdapter**: Traits for converging provider-side state
// - **ConfigStore**: Trait for configuration snapshot persistence
// - **Notifier**: Trait for status notification delivery
// - **EdgeSyncEngine**: Orchestrates the observe → decide → converge cycle
// - **AdapterRegistry**: Plugin-based registry for provider adapters
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic is separate from provider integrations
// 2. **Cycle-Driven**: A timer loop reconciles every configured service per cycle
// 3. **Plugin-Based**: Adapters are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod domain;
pub mod drift;
pub mod engine;
pub mod error;
pub mod net;
pub mod registry;
pub mod resolve;
pub mod source;
pub mod state;
pub mod traits;
pub mod webhook;

// Re-export core types for convenience
pub use config::{
    CdnService, CdnVariant, Config, DnsService, Priority, Protocol, RecordType, Section,
    SourceSpec, WebhookConfig,
};
pub use drift::{DriftState, UpdateDecision};
pub use engine::{EdgeSyncEngine, EngineEvent};
pub use error::{Error, Result};
pub use registry::AdapterRegistry;
pub use resolve::{ResolvedValues, Resolver};
pub use source::{AddressFamily, SourceKey, SourceKind, SourceTarget};
pub use state::{FileConfigStore, MemoryConfigStore};
pub use traits::{
    AddressProbe, CdnAdapter, CdnAdapterFactory, ConfigStore, ConvergeAction, Convergence,
    DnsAdapter, DnsAdapterFactory, Notifier, ServiceKind, ServiceStatus,
};
pub use webhook::WebhookNotifier;
