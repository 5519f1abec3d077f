// # Notifier Trait
//
// Defines the interface for delivering service status notifications.
//
// ## Implementations
//
// - Webhook-based: `crate::webhook::WebhookNotifier`
//
// The engine owns *when* to notify (the 3-strikes gate); implementations
// own only the delivery.

use crate::config::WebhookConfig;
use async_trait::async_trait;
use std::fmt;

/// Which half of the system a notification is about
///
/// Substituted for the `#{serviceType}` placeholder in webhook templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Cdn,
    Dns,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Cdn => "cdn",
            ServiceKind::Dns => "dns",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one service's reconciliation turn
///
/// The `as_str` form is the wire vocabulary substituted for the
/// `#{serviceStatus}` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Validation rejected the service descriptor
    InitFailed,
    /// Validation passed
    InitSuccess,
    /// A dynamic source could not be resolved this cycle
    AddressResolutionFailed,
    /// Values unchanged and no forced refresh due
    NothingChanged,
    /// The provider push failed
    UpdateFailed,
    /// The provider push succeeded
    UpdateSucceeded,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::InitFailed => "init_failed",
            ServiceStatus::InitSuccess => "init_success",
            ServiceStatus::AddressResolutionFailed => "address_resolution_failed",
            ServiceStatus::NothingChanged => "nothing_changed",
            ServiceStatus::UpdateFailed => "update_failed",
            ServiceStatus::UpdateSucceeded => "update_succeeded",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for notification delivery
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one status notification
    ///
    /// Returns `Ok(true)` when a request was sent and answered with a 2xx
    /// status, `Ok(false)` when dispatch was declined (empty URL) or the
    /// answer was non-2xx. Transport-level failures surface as errors; the
    /// engine treats those the same as `Ok(false)` and never retries.
    async fn notify(
        &self,
        webhook: &WebhookConfig,
        kind: ServiceKind,
        service_name: &str,
        status: ServiceStatus,
    ) -> Result<bool, crate::Error>;
}
