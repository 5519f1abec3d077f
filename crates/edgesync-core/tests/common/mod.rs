//! Test doubles and common utilities for engine contract tests
//!
//! This module provides minimal, call-counting doubles for every engine
//! seam so contract tests can assert orchestration behavior without any
//! real network or filesystem access.

#![allow(dead_code)]

use async_trait::async_trait;
use edgesync_core::config::{
    CdnService, CdnVariant, Config, DnsService, RecordType, Section, SourceSpec, WebhookConfig,
};
use edgesync_core::error::Result;
use edgesync_core::registry::AdapterRegistry;
use edgesync_core::resolve::{ResolvedValues, Resolver};
use edgesync_core::source::{AddressFamily, SourceKind, SourceTarget};
use edgesync_core::traits::{
    AddressProbe, CdnAdapter, CdnAdapterFactory, ConfigStore, Convergence, DnsAdapter,
    DnsAdapterFactory, Notifier, ServiceKind, ServiceStatus,
};
use edgesync_core::{EdgeSyncEngine, EngineEvent, Error, MemoryConfigStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A probe that counts live lookups and returns a controllable value
pub struct CountingProbe {
    value: Arc<Mutex<String>>,
    failing: Arc<AtomicBool>,
    probe_calls: Arc<AtomicUsize>,
}

impl CountingProbe {
    pub fn new(value: &str) -> Self {
        Self {
            value: Arc::new(Mutex::new(value.to_string())),
            failing: Arc::new(AtomicBool::new(false)),
            probe_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of live probes performed
    pub fn probe_call_count(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    /// Change the value returned by subsequent probes
    pub fn set_value(&self, value: &str) {
        *self.value.lock().unwrap() = value.to_string();
    }

    /// Make subsequent probes fail with a resolution error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Create a probe that shares counters and value with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            value: Arc::clone(&other.value),
            failing: Arc::clone(&other.failing),
            probe_calls: Arc::clone(&other.probe_calls),
        }
    }
}

#[async_trait]
impl AddressProbe for CountingProbe {
    async fn probe(
        &self,
        _family: AddressFamily,
        _value: &str,
        _pattern: Option<&str>,
    ) -> Result<String> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::resolution("probe failure injected"));
        }
        Ok(self.value.lock().unwrap().clone())
    }

    fn strategy_name(&self) -> &'static str {
        "counting"
    }
}

/// Build a resolver whose three strategies all share one counting probe
pub fn resolver_sharing(probe: &CountingProbe) -> Resolver {
    Resolver::new(
        Box::new(CountingProbe::sharing_counters_with(probe)),
        Box::new(CountingProbe::sharing_counters_with(probe)),
        Box::new(CountingProbe::sharing_counters_with(probe)),
    )
}

/// A CDN adapter factory whose created adapters share its counters
#[derive(Clone, Default)]
pub struct MockCdnFactory {
    validate_calls: Arc<AtomicUsize>,
    converge_calls: Arc<AtomicUsize>,
    fail_validation: Arc<AtomicBool>,
    fail_converge: Arc<AtomicBool>,
    alias: Arc<Mutex<Option<String>>>,
    converged_domains: Arc<Mutex<Vec<String>>>,
}

impl MockCdnFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_call_count(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn converge_call_count(&self) -> usize {
        self.converge_calls.load(Ordering::SeqCst)
    }

    /// Domains that converged successfully, in order
    pub fn converged_domains(&self) -> Vec<String> {
        self.converged_domains.lock().unwrap().clone()
    }

    pub fn set_fail_validation(&self, fail: bool) {
        self.fail_validation.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_converge(&self, fail: bool) {
        self.fail_converge.store(fail, Ordering::SeqCst);
    }

    /// Alias reported by subsequent successful convergences
    pub fn set_alias(&self, alias: Option<&str>) {
        *self.alias.lock().unwrap() = alias.map(str::to_string);
    }
}

impl CdnAdapterFactory for MockCdnFactory {
    fn create(&self) -> Result<Box<dyn CdnAdapter>> {
        Ok(Box::new(MockCdnAdapter {
            shared: self.clone(),
        }))
    }
}

struct MockCdnAdapter {
    shared: MockCdnFactory,
}

#[async_trait]
impl CdnAdapter for MockCdnAdapter {
    fn validate(&self, _service: &CdnService) -> Result<()> {
        self.shared.validate_calls.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_validation.load(Ordering::SeqCst) {
            return Err(Error::validation("validation failure injected"));
        }
        Ok(())
    }

    async fn converge(
        &self,
        service: &CdnService,
        _resolved: &ResolvedValues,
    ) -> Result<Convergence> {
        self.shared.converge_calls.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_converge.load(Ordering::SeqCst) {
            return Err(Error::remote_api("mock", "converge failure injected"));
        }
        self.shared
            .converged_domains
            .lock()
            .unwrap()
            .push(service.domain.clone());
        Ok(Convergence::modified(self.shared.alias.lock().unwrap().clone()))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A DNS adapter factory whose created adapters share its counters
#[derive(Clone, Default)]
pub struct MockDnsFactory {
    validate_calls: Arc<AtomicUsize>,
    converge_calls: Arc<AtomicUsize>,
    fail_converge: Arc<AtomicBool>,
    pushed: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockDnsFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_call_count(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn converge_call_count(&self) -> usize {
        self.converge_calls.load(Ordering::SeqCst)
    }

    /// `(domain, value)` pairs pushed successfully, in order
    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn set_fail_converge(&self, fail: bool) {
        self.fail_converge.store(fail, Ordering::SeqCst);
    }
}

impl DnsAdapterFactory for MockDnsFactory {
    fn create(&self) -> Result<Box<dyn DnsAdapter>> {
        Ok(Box::new(MockDnsAdapter {
            shared: self.clone(),
        }))
    }
}

struct MockDnsAdapter {
    shared: MockDnsFactory,
}

#[async_trait]
impl DnsAdapter for MockDnsAdapter {
    fn validate(&self, _service: &DnsService) -> Result<()> {
        self.shared.validate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn converge(&self, service: &DnsService, value: &str) -> Result<Convergence> {
        self.shared.converge_calls.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_converge.load(Ordering::SeqCst) {
            return Err(Error::remote_api("mockdns", "converge failure injected"));
        }
        self.shared
            .pushed
            .lock()
            .unwrap()
            .push((service.domain.clone(), value.to_string()));
        Ok(Convergence::modified(None))
    }

    fn provider_name(&self) -> &'static str {
        "mockdns"
    }
}

/// A notifier that counts and records every dispatch
#[derive(Clone)]
pub struct CountingNotifier {
    notify_calls: Arc<AtomicUsize>,
    notifications: Arc<Mutex<Vec<(ServiceKind, String, ServiceStatus)>>>,
    deliver: Arc<AtomicBool>,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self {
            notify_calls: Arc::new(AtomicUsize::new(0)),
            notifications: Arc::new(Mutex::new(Vec::new())),
            deliver: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn notify_call_count(&self) -> usize {
        self.notify_calls.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> Vec<(ServiceKind, String, ServiceStatus)> {
        self.notifications.lock().unwrap().clone()
    }

    /// Whether subsequent dispatches report delivery
    pub fn set_delivered(&self, delivered: bool) {
        self.deliver.store(delivered, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(
        &self,
        _webhook: &WebhookConfig,
        kind: ServiceKind,
        service_name: &str,
        status: ServiceStatus,
    ) -> Result<bool> {
        self.notify_calls.fetch_add(1, Ordering::SeqCst);
        self.notifications
            .lock()
            .unwrap()
            .push((kind, service_name.to_string(), status));
        Ok(self.deliver.load(Ordering::SeqCst))
    }
}

/// A config store that counts loads and saves
#[derive(Clone)]
pub struct CountingStore {
    inner: MemoryConfigStore,
    load_calls: Arc<AtomicUsize>,
    save_calls: Arc<AtomicUsize>,
    fail_loads: Arc<AtomicBool>,
}

impl CountingStore {
    pub fn new(config: Config) -> Self {
        Self {
            inner: MemoryConfigStore::new(config),
            load_calls: Arc::new(AtomicUsize::new(0)),
            save_calls: Arc::new(AtomicUsize::new(0)),
            fail_loads: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn load_call_count(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn save_call_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Current stored snapshot (bypasses the counters)
    pub async fn snapshot(&self) -> Config {
        self.inner.snapshot().await
    }
}

#[async_trait]
impl ConfigStore for CountingStore {
    async fn load(&self) -> Result<Config> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Error::store("load failure injected"));
        }
        self.inner.load().await
    }

    async fn save(&self, config: &Config) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.save(config).await
    }
}

/// A dynamic URL source spec for tests
pub fn url_source(url: &str) -> SourceSpec {
    SourceSpec::new(SourceTarget::new(SourceKind::DynamicIpv4Url, url))
}

/// A CDN service wired to the mock provider key
pub fn mock_cdn_service(domain: &str, sources: Vec<SourceSpec>) -> CdnService {
    CdnService {
        id: domain.to_string(),
        name: String::new(),
        domain: domain.to_string(),
        provider: "mock".to_string(),
        variant: CdnVariant::Cdn,
        access_key: "test-ak".to_string(),
        access_secret: "test-sk".to_string(),
        cname: None,
        sources,
    }
}

/// A DNS service wired to the mock provider key
pub fn mock_dns_service(domain: &str, target: SourceTarget) -> DnsService {
    DnsService {
        id: domain.to_string(),
        name: String::new(),
        domain: domain.to_string(),
        provider: "mockdns".to_string(),
        access_key: "test-ak".to_string(),
        access_secret: "test-sk".to_string(),
        record_type: RecordType::A,
        ttl: None,
        target,
    }
}

/// Config with the CDN section enabled
pub fn cdn_config(services: Vec<CdnService>) -> Config {
    Config {
        cdn: Section {
            enabled: true,
            services,
        },
        ..Default::default()
    }
}

/// Config with the DNS section enabled
pub fn dns_config(services: Vec<DnsService>) -> Config {
    Config {
        dns: Section {
            enabled: true,
            services,
        },
        ..Default::default()
    }
}

/// Assemble an engine from doubles, registering the mock provider keys
pub fn build_engine(
    store: &CountingStore,
    cdn: &MockCdnFactory,
    dns: &MockDnsFactory,
    notifier: &CountingNotifier,
    probe: &CountingProbe,
) -> (EdgeSyncEngine, mpsc::Receiver<EngineEvent>) {
    let registry = Arc::new(AdapterRegistry::new());
    registry.register_cdn("mock", Box::new(cdn.clone()));
    registry.register_dns("mockdns", Box::new(dns.clone()));

    EdgeSyncEngine::new(
        Box::new(store.clone()),
        registry,
        Box::new(notifier.clone()),
        resolver_sharing(probe),
    )
}

/// Drain all pending events from a receiver
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
