//! Minimal embedding example for edgesync-core
//!
//! This example demonstrates using edgesync-core as a library in a custom
//! application. Every seam is filled with a custom component and the engine
//! lifecycle is fully managed by the application.

#![allow(dead_code)]

use edgesync_core::config::{CdnService, CdnVariant, Config, SourceSpec};
use edgesync_core::traits::{
    AddressProbe, CdnAdapter, CdnAdapterFactory, Convergence, Notifier, ServiceKind,
    ServiceStatus,
};
use edgesync_core::{
    AdapterRegistry, AddressFamily, EdgeSyncEngine, MemoryConfigStore, ResolvedValues, Resolver,
    Result, SourceKind, SourceTarget, WebhookConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Custom probe for embedded usage
///
/// Returns an application-controlled address instead of touching the
/// network; `set` simulates the observed address changing.
#[derive(Clone)]
struct EmbeddedProbe {
    current: Arc<Mutex<String>>,
}

impl EmbeddedProbe {
    fn new(initial: &str) -> Self {
        Self {
            current: Arc::new(Mutex::new(initial.to_string())),
        }
    }

    /// Simulate an address change (for testing)
    fn set(&self, address: &str) {
        *self.current.lock().unwrap() = address.to_string();
    }
}

#[async_trait::async_trait]
impl AddressProbe for EmbeddedProbe {
    async fn probe(
        &self,
        _family: AddressFamily,
        _value: &str,
        _pattern: Option<&str>,
    ) -> Result<String> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn strategy_name(&self) -> &'static str {
        "embedded"
    }
}

/// Custom CDN adapter for embedded usage
#[derive(Clone)]
struct EmbeddedAdapter {
    converge_calls: Arc<AtomicUsize>,
}

impl EmbeddedAdapter {
    fn new() -> Self {
        Self {
            converge_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn converge_count(&self) -> usize {
        self.converge_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CdnAdapter for EmbeddedAdapter {
    fn validate(&self, _service: &CdnService) -> Result<()> {
        Ok(())
    }

    async fn converge(
        &self,
        service: &CdnService,
        resolved: &ResolvedValues,
    ) -> Result<Convergence> {
        self.converge_calls.fetch_add(1, Ordering::SeqCst);
        let origin = service
            .sources
            .first()
            .map(|source| resolved.value_or_configured(&source.target))
            .unwrap_or("<no sources>");
        println!("[Embedded] Converging {} -> {}", service.domain, origin);

        // Simulate a successful in-place update
        Ok(Convergence::modified(None))
    }

    fn provider_name(&self) -> &'static str {
        "embedded"
    }
}

impl CdnAdapterFactory for EmbeddedAdapter {
    fn create(&self) -> Result<Box<dyn CdnAdapter>> {
        Ok(Box::new(self.clone()))
    }
}

/// Custom notifier for embedded usage
struct EmbeddedNotifier;

#[async_trait::async_trait]
impl Notifier for EmbeddedNotifier {
    async fn notify(
        &self,
        _webhook: &WebhookConfig,
        kind: ServiceKind,
        service_name: &str,
        status: ServiceStatus,
    ) -> Result<bool> {
        println!("[Embedded] Notify {} {} -> {}", kind, service_name, status);
        Ok(true)
    }
}

fn embedded_config() -> Config {
    let mut config = Config::default();
    config.cdn.enabled = true;
    config.cdn.services.push(CdnService {
        id: "embedded-1".to_string(),
        name: "embedded demo".to_string(),
        domain: "cdn.example.com".to_string(),
        provider: "embedded".to_string(),
        variant: CdnVariant::Cdn,
        access_key: "unused".to_string(),
        access_secret: "unused".to_string(),
        cname: None,
        sources: vec![SourceSpec::new(SourceTarget::new(
            SourceKind::DynamicIpv4Url,
            "embedded://probe",
        ))],
    });
    config.webhook.enabled = true;
    config.webhook.url = "embedded://hook".to_string();
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded edgesync-core Example ===\n");

    // Create custom components
    let probe = EmbeddedProbe::new("192.0.2.10");
    let adapter = EmbeddedAdapter::new();

    let registry = Arc::new(AdapterRegistry::new());
    registry.register_cdn("embedded", Box::new(adapter.clone()));

    let resolver = Resolver::new(
        Box::new(probe.clone()),
        Box::new(probe.clone()),
        Box::new(probe.clone()),
    );
    let store = MemoryConfigStore::new(embedded_config());

    // Create engine
    println!("1. Creating engine...");
    let (engine, mut event_rx) = EdgeSyncEngine::new(
        Box::new(store),
        registry,
        Box::new(EmbeddedNotifier),
        resolver,
    );
    let engine = Arc::new(engine);

    // Spawn event listener (optional)
    let event_listener = tokio::spawn(async move {
        println!("2. Event listener started");
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
        println!("Event listener stopped");
    });

    // Run the cycle loop in the background
    println!("3. Starting engine in background...");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let looper = Arc::clone(&engine);
    let engine_handle = tokio::spawn(async move {
        looper
            .run_with_shutdown(Duration::from_millis(200), Some(shutdown_rx))
            .await
    });

    // Let the immediate cycle and one tick pass
    tokio::time::sleep(Duration::from_millis(300)).await;

    println!("\n4. Engine is running. Application can do other work here.");
    println!("   (Engine lifecycle is fully managed by application)\n");

    // Simulate the observed address drifting
    probe.set("192.0.2.99");
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Stop the engine
    println!("5. Stopping engine...");
    let _ = shutdown_tx.send(());
    engine_handle
        .await
        .unwrap_or_else(|_| Ok(()))?;

    // Wait for the event listener to drain
    let _ = tokio::time::timeout(Duration::from_millis(100), event_listener).await;

    println!("\n6. Engine stopped cleanly.");
    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Converge calls observed: {}", adapter.converge_count());
    println!("- Engine lifecycle is fully controlled by application");
    println!("- No global state");
    println!("- All components are custom (not edgesyncd defaults)");

    Ok(())
}
