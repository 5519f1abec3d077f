//! Contract test: update decisions
//!
//! Constraints verified:
//! - The first cycle pushes every enabled service
//! - Unchanged observations are skipped afterwards
//! - A changed observation triggers a push
//! - The forced-refresh countdown pushes on the fifth unchanged cycle
//!   even without drift
//! - Static sources are never probed and never count as drift

mod common;

use common::*;
use edgesync_core::{EngineEvent, ServiceKind, ServiceStatus, SourceKind, SourceSpec, SourceTarget};

#[tokio::test]
async fn first_cycle_pushes_then_unchanged_cycles_skip() {
    let probe = CountingProbe::new("203.0.113.10");
    let cdn = MockCdnFactory::new();
    let dns = MockDnsFactory::new();
    let notifier = CountingNotifier::new();

    let config = cdn_config(vec![mock_cdn_service(
        "a.example.com",
        vec![url_source("https://probe.test/ip")],
    )]);
    let store = CountingStore::new(config);

    let (engine, mut events) = build_engine(&store, &cdn, &dns, &notifier, &probe);
    engine.run_once().await.unwrap();
    assert_eq!(cdn.converge_call_count(), 1, "first cycle always pushes");

    engine.run_once().await.unwrap();
    assert_eq!(cdn.converge_call_count(), 1, "unchanged cycle skipped");

    let events = drain_events(&mut events);
    assert!(events.contains(&EngineEvent::ServiceProcessed {
        kind: ServiceKind::Cdn,
        service: "a.example.com".to_string(),
        status: ServiceStatus::NothingChanged,
    }));
}

#[tokio::test]
async fn changed_observation_triggers_push() {
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
    assert_eq!(cdn.converge_call_count(), 1);

    probe.set_value("203.0.113.99");
    engine.run_once().await.unwrap();
    assert_eq!(cdn.converge_call_count(), 2, "drift forces a push");
}

#[tokio::test]
async fn unchanged_service_is_pushed_on_the_fifth_idle_cycle() {
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
    assert_eq!(cdn.converge_call_count(), 1);

    // Four idle cycles burn the countdown without reaching zero.
    for _ in 0..4 {
        engine.run_once().await.unwrap();
        assert_eq!(cdn.converge_call_count(), 1);
    }

    // The fifth idle cycle exhausts it and forces a push.
    engine.run_once().await.unwrap();
    assert_eq!(cdn.converge_call_count(), 2, "countdown expiry forces a push");

    // And the push reset the countdown.
    engine.run_once().await.unwrap();
    assert_eq!(cdn.converge_call_count(), 2);
}

#[tokio::test]
async fn static_sources_neither_probe_nor_drift() {
    let probe = CountingProbe::new("203.0.113.10");
    let cdn = MockCdnFactory::new();
    let dns = MockDnsFactory::new();
    let notifier = CountingNotifier::new();

    let config = cdn_config(vec![mock_cdn_service(
        "static.example.com",
        vec![SourceSpec::new(SourceTarget::new(
            SourceKind::Ipv4,
            "198.51.100.5",
        ))],
    )]);
    let store = CountingStore::new(config);

    let (engine, _events) = build_engine(&store, &cdn, &dns, &notifier, &probe);
    engine.run_once().await.unwrap();
    engine.run_once().await.unwrap();

    assert_eq!(probe.probe_call_count(), 0, "static origins are never probed");
    assert_eq!(
        cdn.converge_call_count(),
        1,
        "first cycle pushes, a static value cannot drift"
    );
}

#[tokio::test]
async fn dns_services_follow_the_same_decisions() {
    let probe = CountingProbe::new("203.0.113.44");
    let cdn = MockCdnFactory::new();
    let dns = MockDnsFactory::new();
    let notifier = CountingNotifier::new();

    let config = dns_config(vec![mock_dns_service(
        "host.example.com",
        url_source("https://probe.test/ip").target,
    )]);
    let store = CountingStore::new(config);

    let (engine, _events) = build_engine(&store, &cdn, &dns, &notifier, &probe);
    engine.run_once().await.unwrap();
    engine.run_once().await.unwrap();

    assert_eq!(
        dns.pushed(),
        vec![("host.example.com".to_string(), "203.0.113.44".to_string())],
        "one push on the first cycle, none on the unchanged one"
    );
}
