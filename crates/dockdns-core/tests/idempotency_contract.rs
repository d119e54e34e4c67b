//! Architectural Contract Test: Reconciliation Idempotency
//!
//! This test verifies that a pass only writes what differs from the
//! provider's current state.
//!
//! Constraints verified:
//! - A pass over matching provider state issues zero create/update calls
//! - TTL differences are ignored for proxied records
//! - CNAME takes precedence over A/AAAA for the same name
//! - Missing records are created, differing records updated in place
//! - A failing provider call only skips its own (domain, type) pair
//!
//! If this test fails, the engine writes more (or less) than it must.

mod common;

use common::*;
use dockdns_core::{
    DnsConfig, DomainRecord, EngineEvent, Record, RecordType, SyncEngine, Zone, ZoneTarget,
};
use std::collections::HashMap;
use std::sync::Arc;

fn engine_for(
    provider: &Arc<MockDnsProvider>,
    dns: DnsConfig,
    domains: Vec<DomainRecord>,
) -> (SyncEngine, tokio::sync::mpsc::Receiver<EngineEvent>) {
    let zone = Zone::new("mock", "example.com");
    let target = ZoneTarget::new(zone, Box::new(MockDnsProvider::sharing_counters_with(provider)));
    SyncEngine::new(dns, domains, vec![target], Box::new(StaticIpSource::ipv4("203.0.113.7")))
        .expect("engine construction succeeds")
}

#[tokio::test]
async fn matching_record_is_not_rewritten() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    provider.seed(
        Record::new("a.example.com", RecordType::A, "10.0.0.1")
            .with_ttl(300)
            .with_proxied(false),
    );

    let (engine, _events) = engine_for(
        &provider,
        dns_config(),
        vec![domain("a.example.com", "10.0.0.1", 300)],
    );

    let summary = engine.sync().await;

    assert_eq!(provider.create_calls(), 0);
    assert_eq!(provider.update_calls(), 0);
    assert_eq!(summary.unchanged, 1);
}

#[tokio::test]
async fn second_pass_issues_no_writes() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    let (engine, _events) = engine_for(
        &provider,
        dns_config(),
        vec![
            domain("a.example.com", "10.0.0.1", 300),
            DomainRecord::new("b.example.com"),
            DomainRecord {
                cname: "target.example.net".to_string(),
                proxied: true,
                comment: "managed".to_string(),
                ..DomainRecord::new("c.example.com")
            },
        ],
    );

    let first = engine.sync().await;
    assert_eq!(first.created, 3);
    let writes_after_first = provider.write_calls();

    let second = engine.sync().await;

    assert_eq!(
        provider.write_calls(),
        writes_after_first,
        "second pass over unchanged state must not write"
    );
    assert_eq!(second.unchanged, 3);
    assert_eq!(second.created + second.updated, 0);

    // Public IP and default TTL were filled in
    let b = provider.find("b.example.com", RecordType::A).expect("b created");
    assert_eq!(b.content, "203.0.113.7");
    assert_eq!(b.ttl, 300);
}

#[tokio::test]
async fn proxied_record_ignores_ttl_difference() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    provider.seed(
        Record::new("a.example.com", RecordType::A, "10.0.0.1")
            .with_ttl(1)
            .with_proxied(true),
    );

    let (engine, _events) = engine_for(
        &provider,
        dns_config(),
        vec![DomainRecord {
            proxied: true,
            ..domain("a.example.com", "10.0.0.1", 300)
        }],
    );

    engine.sync().await;

    assert_eq!(provider.update_calls(), 0, "provider-managed TTL is not a change");
}

#[tokio::test]
async fn unproxied_ttl_difference_is_updated_in_place() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    let seeded = provider.seed(Record::new("a.example.com", RecordType::A, "10.0.0.1").with_ttl(60));

    let (engine, mut events) = engine_for(
        &provider,
        dns_config(),
        vec![domain("a.example.com", "10.0.0.1", 300)],
    );

    let summary = engine.sync().await;

    assert_eq!(summary.updated, 1);
    assert_eq!(provider.create_calls(), 0);
    let record = provider.find("a.example.com", RecordType::A).unwrap();
    assert_eq!(record.id, seeded.id, "update keeps the provider ID");
    assert_eq!(record.ttl, 300);

    assert_eq!(events.recv().await, Some(EngineEvent::PassStarted));
    assert_eq!(
        events.recv().await,
        Some(EngineEvent::RecordUpdated {
            zone: "example.com".to_string(),
            name: "a.example.com".to_string(),
            record_type: RecordType::A,
        })
    );
}

#[tokio::test]
async fn comment_and_proxied_changes_trigger_update() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    provider.seed(Record::new("a.example.com", RecordType::A, "10.0.0.1").with_ttl(300));
    provider.seed(Record::new("b.example.com", RecordType::A, "10.0.0.2").with_ttl(300));

    let (engine, _events) = engine_for(
        &provider,
        dns_config(),
        vec![
            DomainRecord {
                comment: "web".to_string(),
                ..domain("a.example.com", "10.0.0.1", 300)
            },
            DomainRecord {
                proxied: true,
                ..domain("b.example.com", "10.0.0.2", 300)
            },
        ],
    );

    engine.sync().await;

    assert_eq!(provider.update_calls(), 2);
    assert_eq!(provider.find("a.example.com", RecordType::A).unwrap().comment, "web");
    assert!(provider.find("b.example.com", RecordType::A).unwrap().proxied);
}

#[tokio::test]
async fn cname_takes_precedence_over_address() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    let (engine, _events) = engine_for(
        &provider,
        DnsConfig {
            enable_ip6: true,
            ..dns_config()
        },
        vec![DomainRecord {
            cname: "target.com".to_string(),
            ip6: "2001:db8::1".to_string(),
            ..domain("c.example.com", "10.0.0.1", 300)
        }],
    );

    engine.sync().await;

    assert_eq!(provider.get_calls(), 1, "only the CNAME is looked up");
    assert_eq!(provider.create_calls(), 1);
    let records = provider.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_type, RecordType::Cname);
    assert_eq!(records[0].content, "target.com");
}

#[tokio::test]
async fn existing_record_without_id_is_created() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    provider.seed_raw(Record::new("a.example.com", RecordType::A, "10.0.0.9"));

    let (engine, _events) = engine_for(
        &provider,
        dns_config(),
        vec![domain("a.example.com", "10.0.0.1", 300)],
    );

    engine.sync().await;

    assert_eq!(provider.create_calls(), 1);
    assert_eq!(provider.update_calls(), 0);
}

#[tokio::test]
async fn zone_overrides_shape_the_desired_record() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    let (engine, _events) = engine_for(
        &provider,
        dns_config(),
        vec![DomainRecord {
            ip4_overrides: Some(HashMap::from([("example.com".to_string(), "192.0.2.10".to_string())])),
            ttl_overrides: Some(HashMap::from([("example.com".to_string(), 120)])),
            proxied_overrides: Some(HashMap::from([("example.com".to_string(), false)])),
            comment_overrides: Some(HashMap::from([("example.com".to_string(), String::new())])),
            proxied: true,
            comment: "default".to_string(),
            ..domain("a.example.com", "10.0.0.1", 300)
        }],
    );

    engine.sync().await;

    let record = provider.find("a.example.com", RecordType::A).unwrap();
    assert_eq!(record.content, "192.0.2.10");
    assert_eq!(record.ttl, 120);
    assert!(!record.proxied);
    assert_eq!(record.comment, "");
}

#[tokio::test]
async fn failing_pair_does_not_abort_pass() {
    let provider = Arc::new(MockDnsProvider::new("mock"));
    provider.fail_for("get", "a.example.com");
    provider.fail_for("create", "b.example.com");

    let (engine, _events) = engine_for(
        &provider,
        dns_config(),
        vec![
            domain("a.example.com", "10.0.0.1", 300),
            domain("b.example.com", "10.0.0.2", 300),
            domain("c.example.com", "10.0.0.3", 300),
        ],
    );

    let summary = engine.sync().await;

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.created, 1);
    assert!(provider.find("c.example.com", RecordType::A).is_some());
    assert_eq!(provider.create_calls(), 2, "no create after a failed get");
}

#[tokio::test]
async fn engine_requires_a_zone() {
    let result = SyncEngine::new(
        dns_config(),
        Vec::new(),
        Vec::new(),
        Box::new(StaticIpSource::ipv4("203.0.113.7")),
    );
    assert!(result.is_err());
}
