//! Per-service drift tracking
//!
//! Each managed service keeps a [`DriftState`] across cycles: the last
//! observed value per source, a countdown that forces a refresh after a
//! number of unchanged cycles, and a consecutive-failure counter that gates
//! webhook dispatch.

use crate::source::SourceKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use tokio::sync::RwLock;

/// Forced-refresh countdown applied when the environment gives no override
pub const DEFAULT_REFRESH_CYCLES: i64 = 5;

/// Read a forced-refresh cycle count from the environment
///
/// Unset or unparsable values fall back to [`DEFAULT_REFRESH_CYCLES`].
/// Negative values are taken verbatim; a countdown that starts below one
/// never hits zero exactly, which disables forced refreshes.
pub fn refresh_cycles_from_env(var: &str) -> i64 {
    parse_refresh_cycles(std::env::var(var).ok().as_deref())
}

fn parse_refresh_cycles(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_REFRESH_CYCLES)
}

/// What a reconciliation cycle should do with a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// No cycle has seen this service yet; push unconditionally
    FirstRun,
    /// At least one observed value differs from the stored one
    Drift { changed: Vec<SourceKey> },
    /// Values unchanged but the forced-refresh countdown just expired
    RefreshExpired,
    /// Values unchanged, countdown still running
    Skip,
}

impl UpdateDecision {
    /// Whether the provider should be pushed this cycle
    pub fn requires_update(&self) -> bool {
        !matches!(self, UpdateDecision::Skip)
    }
}

/// Drift cache for a single service
///
/// Shared between cycles behind an `Arc`; all mutation goes through atomics
/// or the internal lock so `decide` can be called without `&mut`.
#[derive(Debug)]
pub struct DriftState {
    /// Last observed value per source key
    values: RwLock<HashMap<SourceKey, String>>,
    /// Cycles left before an unchanged service is pushed anyway
    refresh_left: AtomicI64,
    /// Countdown start value, restored by [`reset_refresh`](Self::reset_refresh)
    refresh_default: i64,
    /// Set after the first decision
    has_run: AtomicBool,
    /// Consecutive failed update attempts
    failures: AtomicU32,
}

impl DriftState {
    pub fn new(refresh_default: i64) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            refresh_left: AtomicI64::new(refresh_default),
            refresh_default,
            has_run: AtomicBool::new(false),
            failures: AtomicU32::new(0),
        }
    }

    /// Compare observed values against the stored ones and decide
    ///
    /// Stored values are overwritten during the comparison, so a failed
    /// update is not retried by the drift check alone; the forced-refresh
    /// countdown covers that case.
    pub async fn decide(&self, observed: &[(SourceKey, String)]) -> UpdateDecision {
        let first_run = !self.has_run.swap(true, Ordering::SeqCst);

        let mut changed = Vec::new();
        {
            let mut values = self.values.write().await;
            for (key, value) in observed {
                match values.get(key) {
                    Some(stored) if stored == value => {}
                    _ => {
                        changed.push(key.clone());
                        values.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        if first_run {
            return UpdateDecision::FirstRun;
        }
        if !changed.is_empty() {
            return UpdateDecision::Drift { changed };
        }

        let left = self.refresh_left.fetch_sub(1, Ordering::SeqCst) - 1;
        if left == 0 {
            UpdateDecision::RefreshExpired
        } else {
            UpdateDecision::Skip
        }
    }

    /// Restart the forced-refresh countdown (after any update attempt)
    pub fn reset_refresh(&self) {
        self.refresh_left.store(self.refresh_default, Ordering::SeqCst);
    }

    /// Record a failed update attempt; returns the new consecutive count
    pub fn record_failure(&self) -> u32 {
        self.failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Clear the consecutive-failure counter
    pub fn reset_failures(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }

    /// Current consecutive-failure count
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }
}
