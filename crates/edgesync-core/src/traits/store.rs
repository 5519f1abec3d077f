// # Config Store Trait
//
// Defines the interface for loading and persisting the configuration
// snapshot the engine works from.
//
// ## Purpose
//
// The engine reads a fresh snapshot at the start of every cycle and writes
// one back at most once per cycle, when a convergence learned a new alias.
// The core never touches the on-disk format itself; implementations own
// parsing, atomicity and caching.
//
// ## Implementations
//
// - Memory-based: for tests and embedding
// - File-based: JSON file with modification-time caching

use crate::config::Config;
use async_trait::async_trait;

/// Trait for configuration snapshot storage
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the current configuration snapshot
    ///
    /// A load failure aborts the engine cycle that requested it, so
    /// implementations should prefer returning a cached snapshot over
    /// failing when the backing store is transiently unreadable.
    async fn load(&self) -> Result<Config, crate::Error>;

    /// Persist a mutated configuration snapshot
    async fn save(&self, config: &Config) -> Result<(), crate::Error>;
}
