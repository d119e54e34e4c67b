//! Test doubles and common utilities for architecture contract tests
//!
//! This module provides minimal test doubles that verify architectural
//! constraints without talking to real backends.

#![allow(dead_code)]

use async_trait::async_trait;
use dockdns_core::error::{Error, Result};
use dockdns_core::schedule::{ScheduledTask, Trigger, TriggerEvent};
use dockdns_core::shutdown::Shutdown;
use dockdns_core::traits::{DnsProvider, DomainSource, PublicIpSource};
use dockdns_core::{DnsConfig, DomainRecord, Record, RecordType};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// An in-memory DnsProvider that tracks calls
pub struct MockDnsProvider {
    records: Arc<Mutex<Vec<Record>>>,
    next_id: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    /// Operations that fail ("list", "get", "create", "update", "delete"),
    /// optionally scoped to one record name as "op:name"
    failures: Arc<Mutex<HashSet<String>>>,
    pub name: &'static str,
}

impl MockDnsProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
            list_calls: Arc::new(AtomicUsize::new(0)),
            get_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            update_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(Mutex::new(HashSet::new())),
            name,
        }
    }

    /// Create a new MockDnsProvider that shares state and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            next_id: Arc::clone(&other.next_id),
            list_calls: Arc::clone(&other.list_calls),
            get_calls: Arc::clone(&other.get_calls),
            create_calls: Arc::clone(&other.create_calls),
            update_calls: Arc::clone(&other.update_calls),
            delete_calls: Arc::clone(&other.delete_calls),
            failures: Arc::clone(&other.failures),
            name: other.name,
        }
    }

    /// Seed a record the backend already holds
    pub fn seed(&self, record: Record) -> Record {
        let record = if record.exists() {
            record
        } else {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            record.with_id(format!("seed-{id}"))
        };
        self.records.lock().unwrap().push(record.clone());
        record
    }

    /// Seed a record exactly as given, even without an ID
    pub fn seed_raw(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }

    pub fn fail(&self, op: &str) {
        self.failures.lock().unwrap().insert(op.to_string());
    }

    pub fn fail_for(&self, op: &str, name: &str) {
        self.failures.lock().unwrap().insert(format!("{op}:{name}"));
    }

    fn check(&self, op: &str, name: Option<&str>) -> Result<()> {
        let failures = self.failures.lock().unwrap();
        let scoped = name.is_some_and(|n| failures.contains(&format!("{op}:{n}")));
        if scoped || failures.contains(op) {
            return Err(Error::provider(self.name, format!("injected {op} failure")));
        }
        Ok(())
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn find(&self, name: &str, record_type: RecordType) -> Option<Record> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name && r.record_type == record_type)
            .cloned()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Create + update + delete calls
    pub fn write_calls(&self) -> usize {
        self.create_calls() + self.update_calls() + self.delete_calls()
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list(&self) -> Result<Vec<Record>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check("list", None)?;
        Ok(self.records())
    }

    async fn get(&self, name: &str, record_type: RecordType) -> Result<Option<Record>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check("get", Some(name))?;
        Ok(self.find(name, record_type))
    }

    async fn create(&self, record: Record) -> Result<Record> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check("create", Some(&record.name))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = record.with_id(format!("rec-{id}"));
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: Record) -> Result<Record> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check("update", Some(&record.name))?;
        let mut records = self.records.lock().unwrap();
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| Error::not_found(format!("record {}", record.id)))?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete(&self, record: &Record) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check("delete", Some(&record.name))?;
        self.records.lock().unwrap().retain(|r| r.id != record.id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// A PublicIpSource with fixed answers; `None` fails the lookup
pub struct StaticIpSource {
    ip4: Option<String>,
    ip6: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticIpSource {
    pub fn new(ip4: Option<&str>, ip6: Option<&str>) -> Self {
        Self {
            ip4: ip4.map(str::to_string),
            ip6: ip6.map(str::to_string),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ipv4(ip4: &str) -> Self {
        Self::new(Some(ip4), None)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            ip4: other.ip4.clone(),
            ip6: other.ip6.clone(),
            calls: Arc::clone(&other.calls),
        }
    }
}

#[async_trait]
impl PublicIpSource for StaticIpSource {
    async fn public_ipv4(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip4.clone().ok_or_else(|| Error::ip_lookup("no IPv4"))
    }

    async fn public_ipv6(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ip6.clone().ok_or_else(|| Error::ip_lookup("no IPv6"))
    }
}

/// A DomainSource with a fixed answer; `None` fails the lookup
pub struct StaticDomainSource {
    domains: Option<Vec<DomainRecord>>,
}

impl StaticDomainSource {
    pub fn new(domains: Vec<DomainRecord>) -> Self {
        Self {
            domains: Some(domains),
        }
    }

    pub fn failing() -> Self {
        Self { domains: None }
    }
}

#[async_trait]
impl DomainSource for StaticDomainSource {
    async fn domains(&self) -> Result<Vec<DomainRecord>> {
        self.domains
            .clone()
            .ok_or_else(|| Error::docker("daemon unreachable"))
    }
}

/// A trigger that emits one event at each offset from its start
pub struct ScriptedTrigger {
    offsets: Vec<Duration>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedTrigger {
    pub fn new(offsets: Vec<Duration>) -> Self {
        Self {
            offsets,
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Events every `every`, starting at `first`, up to `until`
    pub fn every(first: Duration, every: Duration, until: Duration) -> Self {
        let mut offsets = Vec::new();
        let mut at = first;
        while at <= until {
            offsets.push(at);
            at += every;
        }
        Self::new(offsets)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Trigger for ScriptedTrigger {
    fn name(&self) -> &str {
        "ScriptedTrigger"
    }

    async fn start(&self, mut shutdown: Shutdown, events: mpsc::Sender<TriggerEvent>) {
        let start = Instant::now();
        for offset in &self.offsets {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep_until(start + *offset) => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => return,
                sent = events.send(TriggerEvent::new(self.name())) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
        shutdown.cancelled().await;
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// A ScheduledTask that records when it ran
pub struct CountingTask {
    started: Instant,
    runs: Mutex<Vec<Duration>>,
    /// Simulated work per run
    work: Duration,
    running: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl CountingTask {
    pub fn new() -> Self {
        Self::with_work(Duration::ZERO)
    }

    pub fn with_work(work: Duration) -> Self {
        Self {
            started: Instant::now(),
            runs: Mutex::new(Vec::new()),
            work,
            running: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }

    /// Offsets from construction at which runs started
    pub fn runs(&self) -> Vec<Duration> {
        self.runs.lock().unwrap().clone()
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduledTask for CountingTask {
    async fn run(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        self.runs.lock().unwrap().push(self.started.elapsed());
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// DNS settings used by most tests: IPv4 only, default TTL 300
pub fn dns_config() -> DnsConfig {
    DnsConfig {
        enable_ip4: true,
        enable_ip6: false,
        default_ttl: 300,
        purge_unknown: false,
    }
}

/// Domain record with an explicit IPv4 address and TTL
pub fn domain(name: &str, ip4: &str, ttl: u32) -> DomainRecord {
    DomainRecord {
        ip4: ip4.to_string(),
        ttl,
        ..DomainRecord::new(name)
    }
}

pub fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}
