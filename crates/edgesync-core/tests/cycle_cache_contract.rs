//! Contract test: cycle cache behavior
//!
//! Constraints verified:
//! - One live probe per source identity per cycle, no matter how many
//!   services share the identity
//! - The cache is cleared between cycles (next cycle probes again)
//! - A failed resolution skips only the affected service

mod common;

use common::*;
use edgesync_core::{EngineEvent, ServiceKind, ServiceStatus, SourceKind, SourceSpec, SourceTarget};

#[tokio::test]
async fn shared_source_is_probed_once_per_cycle() {
    let probe = CountingProbe::new("203.0.113.10");
    let cdn = MockCdnFactory::new();
    let dns = MockDnsFactory::new();
    let notifier = CountingNotifier::new();

    // Two services share one dynamic source; a third brings its own.
    let shared = url_source("https://probe.test/ip");
    let config = cdn_config(vec![
        mock_cdn_service("a.example.com", vec![shared.clone()]),
        mock_cdn_service("b.example.com", vec![shared.clone()]),
        mock_cdn_service("c.example.com", vec![url_source("https://other.test/ip")]),
    ]);
    let store = CountingStore::new(config);

    let (engine, _events) = build_engine(&store, &cdn, &dns, &notifier, &probe);
    engine.run_once().await.unwrap();

    assert_eq!(
        probe.probe_call_count(),
        2,
        "expected one live probe per distinct source identity"
    );
    assert_eq!(cdn.converge_call_count(), 3, "all three services converged");
}

#[tokio::test]
async fn cache_is_cleared_between_cycles() {
    let probe = CountingProbe::new("203.0.113.10");
    let cdn = MockCdnFactory::new();
    let dns = MockDnsFactory::new();
    let notifier = CountingNotifier::new();

    let config = cdn_config(vec![mock_cdn_service(
        "a.example.com",
        vec![url_source("https://probe.test/ip")],
    )]);
    let store = CountingStore::new(config);

    let (engine, _events) = build_engine(&store, &cdn, &dns, &notifier, &probe);
    engine.run_once().await.unwrap();
    engine.run_once().await.unwrap();

    assert_eq!(
        probe.probe_call_count(),
        2,
        "each cycle performs its own live probe"
    );
}

#[tokio::test]
async fn resolution_failure_skips_only_the_affected_service() {
    let probe = CountingProbe::new("203.0.113.10");
    probe.set_failing(true);
    let cdn = MockCdnFactory::new();
    let dns = MockDnsFactory::new();
    let notifier = CountingNotifier::new();

    // First service carries a static origin, second a dynamic one.
    let static_spec = SourceSpec::new(SourceTarget::new(SourceKind::Ipv4, "198.51.100.5"));
    let config = cdn_config(vec![
        mock_cdn_service("static.example.com", vec![static_spec]),
        mock_cdn_service("dynamic.example.com", vec![url_source("https://probe.test/ip")]),
    ]);
    let store = CountingStore::new(config);

    let (engine, mut events) = build_engine(&store, &cdn, &dns, &notifier, &probe);
    engine.run_once().await.unwrap();

    assert_eq!(
        cdn.converged_domains(),
        vec!["static.example.com".to_string()],
        "only the static service converged"
    );
    assert_eq!(
        notifier.notify_call_count(),
        0,
        "resolution failures never notify"
    );

    let events = drain_events(&mut events);
    assert!(events.contains(&EngineEvent::ServiceProcessed {
        kind: ServiceKind::Cdn,
        service: "dynamic.example.com".to_string(),
        status: ServiceStatus::AddressResolutionFailed,
    }));
}
