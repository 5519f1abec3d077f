//! Core reconciliation engine
//!
//! The EdgeSyncEngine is responsible for:
//! - Loading a configuration snapshot each cycle via ConfigStore
//! - Resolving observed addresses via the Resolver (cycle-cached)
//! - Deciding per service whether to push via the DriftState machine
//! - Converging provider state via the registered adapters
//! - Gating webhook notifications (3-strikes rule) via the Notifier
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ ConfigStore  │─── snapshot ────────┐
//! └──────────────┘                     │
//!                                      ▼
//!                             ┌────────────────┐
//! ┌──────────────┐            │ EdgeSyncEngine │
//! │   Resolver   │◄── probe ──│  (cycle loop)  │
//! └──────────────┘            └────────────────┘
//!                                      │
//!         ┌────────────────────────────┼────────────────────────────┐
//!         │                            │                            │
//!         ▼                            ▼                            ▼
//! ┌──────────────┐            ┌────────────────┐           ┌─────────────┐
//! │  DriftState  │            │ Cdn/DnsAdapter │           │  Notifier   │
//! │  (decide)    │            │  (converge)    │           │  (webhook)  │
//! └──────────────┘            └────────────────┘           └─────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Load the configuration snapshot (a load failure aborts the cycle,
//!    leaving all cached state untouched)
//! 2. Clear the resolver's cycle cache
//! 3. CDN pass: per service — adapter lookup, validate, resolve, decide,
//!    converge; persist the configuration once at the end of the pass when
//!    any service learned a new alias
//! 4. DNS pass: same machine with a single source per service; never
//!    persists
//! 5. Emit events for monitoring/logging

use crate::config::{CdnService, DnsService, WebhookConfig};
use crate::drift::{refresh_cycles_from_env, DriftState};
use crate::registry::AdapterRegistry;
use crate::resolve::{ResolvedValues, Resolver};
use crate::traits::{CdnAdapter, ConfigStore, DnsAdapter, Notifier, ServiceKind, ServiceStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

/// Environment variable overriding the CDN forced-refresh countdown
pub const CDN_REFRESH_CYCLES_VAR: &str = "EDGESYNC_CDN_REFRESH_CYCLES";

/// Environment variable overriding the DNS forced-refresh countdown
pub const DNS_REFRESH_CYCLES_VAR: &str = "EDGESYNC_DNS_REFRESH_CYCLES";

/// Capacity of the bounded event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the EdgeSyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started its timer loop
    Started {
        interval_secs: u64,
    },

    /// One service finished its turn with a final status
    ServiceProcessed {
        kind: ServiceKind,
        service: String,
        status: ServiceStatus,
    },

    /// A webhook dispatch was attempted
    WebhookDispatched {
        kind: ServiceKind,
        service: String,
        status: ServiceStatus,
        delivered: bool,
    },

    /// The configuration snapshot was written back (alias learned)
    ConfigPersisted,

    /// One full cycle completed
    CycleCompleted {
        cdn_services: usize,
        dns_services: usize,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Core reconciliation engine
///
/// The engine orchestrates the whole observe → decide → converge flow.
/// It runs one sequential pass over all configured services per cycle.
///
/// ## Lifecycle
///
/// 1. Create with [`EdgeSyncEngine::new()`]
/// 2. Start the timer loop with [`EdgeSyncEngine::run()`], or drive single
///    cycles with [`EdgeSyncEngine::run_once()`]
/// 3. Engine runs until a shutdown signal is received
///
/// ## Concurrency
///
/// The pass itself is sequential. An externally triggered `run_once` may
/// overlap with a timer-driven cycle; the cycle cache and drift states are
/// lock-guarded so such overlap is safe, but no cycle-level mutual
/// exclusion is attempted.
pub struct EdgeSyncEngine {
    /// Configuration snapshot source
    store: Box<dyn ConfigStore>,

    /// Adapter factories keyed by provider
    registry: Arc<AdapterRegistry>,

    /// Notification delivery
    notifier: Box<dyn Notifier>,

    /// Source resolution with the per-cycle cache
    resolver: Resolver,

    /// Drift state per CDN service, positionally aligned with the snapshot
    cdn_drift: RwLock<Vec<Arc<DriftState>>>,

    /// Drift state per DNS service, positionally aligned with the snapshot
    dns_drift: RwLock<Vec<Arc<DriftState>>>,

    /// Pending force-refresh request for the CDN pass
    cdn_refresh: AtomicBool,

    /// Pending force-refresh request for the DNS pass
    dns_refresh: AtomicBool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl EdgeSyncEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `store`: configuration snapshot source
    /// - `registry`: adapter factories keyed by provider
    /// - `notifier`: notification delivery
    /// - `resolver`: source resolution (owns the cycle cache)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events; events are dropped when the receiver lags.
    pub fn new(
        store: Box<dyn ConfigStore>,
        registry: Arc<AdapterRegistry>,
        notifier: Box<dyn Notifier>,
        resolver: Resolver,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            store,
            registry,
            notifier,
            resolver,
            cdn_drift: RwLock::new(Vec::new()),
            dns_drift: RwLock::new(Vec::new()),
            cdn_refresh: AtomicBool::new(false),
            dns_refresh: AtomicBool::new(false),
            event_tx: tx,
        };

        (engine, rx)
    }

    /// Request that the next pass of a kind rebuilds its drift states
    ///
    /// Consumed by exactly one pass; typically set after an external
    /// configuration change so stale per-service state is discarded.
    pub fn request_refresh(&self, kind: ServiceKind) {
        match kind {
            ServiceKind::Cdn => self.cdn_refresh.store(true, Ordering::SeqCst),
            ServiceKind::Dns => self.dns_refresh.store(true, Ordering::SeqCst),
        }
    }

    /// Run the engine's timer loop
    ///
    /// Performs one cycle immediately, then one per interval tick, until a
    /// SIGINT is received.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&self, interval: Duration) -> Result<(), crate::Error> {
        self.run_internal(interval, None).await
    }

    /// Run the timer loop with a controlled shutdown signal
    ///
    /// Used by the daemon (which owns signal handling) and by tests that
    /// need deterministic shutdown. `run()` is the self-contained variant.
    pub async fn run_with_shutdown(
        &self,
        interval: Duration,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<(), crate::Error> {
        self.run_internal(interval, shutdown_rx).await
    }

    async fn run_internal(
        &self,
        interval: Duration,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<(), crate::Error> {
        self.emit_event(EngineEvent::Started {
            interval_secs: interval.as_secs(),
        });

        let mut ticker = tokio::time::interval(interval);
        // A cycle that overruns its tick should not cause a burst afterwards.
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        if let Some(mut rx) = shutdown_rx {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            error!("Cycle aborted: {}", e);
                        }
                    }

                    _ = &mut rx => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            error!("Cycle aborted: {}", e);
                            // Keep running; the next tick retries from scratch
                        }
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run exactly one reconciliation cycle
    ///
    /// Public so an external trigger (e.g. a configuration-change watcher)
    /// can run a one-off cycle concurrently with the timer loop.
    pub async fn run_once(&self) -> Result<(), crate::Error> {
        let mut config = self.store.load().await?;
        self.resolver.clear().await;

        let webhook = config.webhook.clone();

        let mut cdn_processed = 0;
        if config.cdn.enabled {
            let force = self.cdn_refresh.swap(false, Ordering::SeqCst);
            let states = self
                .drift_states(ServiceKind::Cdn, config.cdn.services.len(), force)
                .await;

            let mut config_changed = false;
            for (service, drift) in config.cdn.services.iter_mut().zip(states.iter()) {
                if self.process_cdn_service(service, drift, &webhook).await {
                    config_changed = true;
                }
                cdn_processed += 1;
            }

            // One write per pass no matter how many services mutated.
            if config_changed {
                match self.store.save(&config).await {
                    Ok(()) => {
                        info!("Configuration persisted with learned aliases");
                        self.emit_event(EngineEvent::ConfigPersisted);
                    }
                    Err(e) => error!("Failed to persist configuration: {}", e),
                }
            }
        }

        let mut dns_processed = 0;
        if config.dns.enabled {
            let force = self.dns_refresh.swap(false, Ordering::SeqCst);
            let states = self
                .drift_states(ServiceKind::Dns, config.dns.services.len(), force)
                .await;

            for (service, drift) in config.dns.services.iter().zip(states.iter()) {
                self.process_dns_service(service, drift, &webhook).await;
                dns_processed += 1;
            }
        }

        self.emit_event(EngineEvent::CycleCompleted {
            cdn_services: cdn_processed,
            dns_services: dns_processed,
        });
        Ok(())
    }

    /// Drift states for a pass, rebuilt on force or service-count change
    async fn drift_states(
        &self,
        kind: ServiceKind,
        count: usize,
        force: bool,
    ) -> Vec<Arc<DriftState>> {
        let slot = match kind {
            ServiceKind::Cdn => &self.cdn_drift,
            ServiceKind::Dns => &self.dns_drift,
        };

        {
            let states = slot.read().await;
            if !force && states.len() == count {
                return states.clone();
            }
        }

        let var = match kind {
            ServiceKind::Cdn => CDN_REFRESH_CYCLES_VAR,
            ServiceKind::Dns => DNS_REFRESH_CYCLES_VAR,
        };
        let cycles = refresh_cycles_from_env(var);
        debug!(kind = %kind, count, cycles, "Rebuilding drift states");

        let fresh: Vec<Arc<DriftState>> =
            (0..count).map(|_| Arc::new(DriftState::new(cycles))).collect();
        let mut states = slot.write().await;
        *states = fresh.clone();
        fresh
    }

    /// Process one CDN service; returns whether the configuration mutated
    async fn process_cdn_service(
        &self,
        service: &mut CdnService,
        drift: &DriftState,
        webhook: &WebhookConfig,
    ) -> bool {
        let label = service.label().to_string();

        let adapter = match self.registry.create_cdn(&service.provider) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(service = %label, provider = %service.provider, error = %e,
                      "Unknown CDN provider, skipping service");
                return false;
            }
        };

        let (status, config_changed) =
            self.reconcile_cdn(adapter.as_ref(), service, drift).await;

        self.emit_event(EngineEvent::ServiceProcessed {
            kind: ServiceKind::Cdn,
            service: label.clone(),
            status,
        });
        self.evaluate_webhook(ServiceKind::Cdn, &label, status, drift, webhook)
            .await;

        config_changed
    }

    async fn reconcile_cdn(
        &self,
        adapter: &dyn CdnAdapter,
        service: &mut CdnService,
        drift: &DriftState,
    ) -> (ServiceStatus, bool) {
        if let Err(e) = adapter.validate(service) {
            warn!(service = %service.label(), error = %e, "CDN service failed validation");
            return (ServiceStatus::InitFailed, false);
        }

        // Resolve each dynamic source once; identical identities share cache
        // entries. Static sources go out verbatim and never count as drift.
        let mut resolved = ResolvedValues::new();
        let mut observed = Vec::new();
        for spec in &service.sources {
            if !spec.target.kind.is_dynamic() {
                continue;
            }
            match self.resolver.resolve(&spec.target).await {
                Ok(value) => {
                    let key = spec.target.key();
                    observed.push((key.clone(), value.clone()));
                    resolved.insert(key, value);
                }
                Err(e) => {
                    warn!(service = %service.label(), source = %spec.target.key(), error = %e,
                          "Address resolution failed");
                    return (ServiceStatus::AddressResolutionFailed, false);
                }
            }
        }

        let decision = drift.decide(&observed).await;
        if !decision.requires_update() {
            debug!(service = %service.label(), "Nothing changed");
            return (ServiceStatus::NothingChanged, false);
        }
        info!(service = %service.label(), decision = ?decision, "Pushing CDN origin configuration");

        let result = adapter.converge(service, &resolved).await;
        drift.reset_refresh();

        match result {
            Ok(convergence) => {
                let mut changed = false;
                if let Some(alias) = convergence.alias {
                    if service.cname.as_deref() != Some(alias.as_str()) {
                        service.cname = Some(alias);
                        changed = true;
                    }
                }
                info!(service = %service.label(), action = ?convergence.action,
                      "CDN convergence succeeded");
                (ServiceStatus::UpdateSucceeded, changed)
            }
            Err(e) => {
                warn!(service = %service.label(), error = %e, "CDN convergence failed");
                (ServiceStatus::UpdateFailed, false)
            }
        }
    }

    /// Process one DNS service; DNS learns no alias so nothing is persisted
    async fn process_dns_service(
        &self,
        service: &DnsService,
        drift: &DriftState,
        webhook: &WebhookConfig,
    ) {
        let label = service.label().to_string();

        let adapter = match self.registry.create_dns(&service.provider) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(service = %label, provider = %service.provider, error = %e,
                      "Unknown DNS provider, skipping service");
                return;
            }
        };

        let status = self.reconcile_dns(adapter.as_ref(), service, drift).await;

        self.emit_event(EngineEvent::ServiceProcessed {
            kind: ServiceKind::Dns,
            service: label.clone(),
            status,
        });
        self.evaluate_webhook(ServiceKind::Dns, &label, status, drift, webhook)
            .await;
    }

    async fn reconcile_dns(
        &self,
        adapter: &dyn DnsAdapter,
        service: &DnsService,
        drift: &DriftState,
    ) -> ServiceStatus {
        if let Err(e) = adapter.validate(service) {
            warn!(service = %service.label(), error = %e, "DNS service failed validation");
            return ServiceStatus::InitFailed;
        }

        let value = match self.resolver.resolve(&service.target).await {
            Ok(value) => value,
            Err(e) => {
                warn!(service = %service.label(), source = %service.target.key(), error = %e,
                      "Address resolution failed");
                return ServiceStatus::AddressResolutionFailed;
            }
        };

        // Static targets never count as drift; they ride the countdown.
        let mut observed = Vec::new();
        if service.target.kind.is_dynamic() {
            observed.push((service.target.key(), value.clone()));
        }
        let decision = drift.decide(&observed).await;
        if !decision.requires_update() {
            debug!(service = %service.label(), "Nothing changed");
            return ServiceStatus::NothingChanged;
        }
        info!(service = %service.label(), decision = ?decision, value = %value,
              "Pushing DNS record");

        let result = adapter.converge(service, &value).await;
        drift.reset_refresh();

        match result {
            Ok(convergence) => {
                info!(service = %service.label(), action = ?convergence.action,
                      "DNS convergence succeeded");
                ServiceStatus::UpdateSucceeded
            }
            Err(e) => {
                warn!(service = %service.label(), error = %e, "DNS convergence failed");
                ServiceStatus::UpdateFailed
            }
        }
    }

    /// Apply the webhook gate for one final status
    ///
    /// Success resets the consecutive-failure counter and always notifies;
    /// a failure notifies only on the third consecutive occurrence, then
    /// resets the counter. All other statuses never notify. Counter upkeep
    /// happens even when the webhook is disabled.
    async fn evaluate_webhook(
        &self,
        kind: ServiceKind,
        service: &str,
        status: ServiceStatus,
        drift: &DriftState,
        webhook: &WebhookConfig,
    ) {
        let due = match status {
            ServiceStatus::UpdateSucceeded => {
                drift.reset_failures();
                true
            }
            ServiceStatus::UpdateFailed => {
                let failures = drift.record_failure();
                if failures >= 3 {
                    drift.reset_failures();
                    true
                } else {
                    false
                }
            }
            _ => false,
        };

        if !due || !webhook.enabled {
            return;
        }

        let delivered = match self.notifier.notify(webhook, kind, service, status).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!(service = %service, error = %e, "Webhook dispatch failed");
                false
            }
        };
        if delivered {
            info!(service = %service, status = %status, "Webhook delivered");
        } else {
            warn!(service = %service, status = %status, "Webhook was not delivered");
        }

        self.emit_event(EngineEvent::WebhookDispatched {
            kind,
            service: service.to_string(),
            status,
            delivered,
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // The channel is bounded; a lagging consumer loses events rather
        // than stalling the cycle.
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event");
        }
    }
}
