//! Core reconciliation engine
//!
//! The SyncEngine is responsible for:
//! - Merging static domain records with dynamically discovered ones
//! - Filling missing addresses and TTLs
//! - Routing domains to the zones they belong to
//! - Bringing each zone's provider records in line with the desired state
//! - Purging records nothing accounts for (opt-in)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ static config│   │ DomainSource │
//! └──────────────┘   └──────────────┘
//!         └──── merge ──────┘
//!                  │            ┌────────────────┐
//!                  ▼            │ PublicIpSource │
//!          apply_defaults ◀─────┴────────────────┘
//!                  │
//!       ┌──────────┼──────────┐     per zone, in configuration order
//!       ▼          ▼          ▼
//!   filter_domains → update_records → purge_unknown_records
//!                  │
//!                  ▼
//!            DnsProvider
//! ```
//!
//! ## Pass Guarantees
//!
//! A pass never fails as a whole. Every failing provider call is logged and
//! skips only its own (domain, type) pair; a failing `list` skips only that
//! zone's purge. A pass over unchanged state issues no writes.

mod purge;

pub use purge::is_known;

use crate::config::{DnsConfig, Zone};
use crate::error::{Error, Result};
use crate::record::{DomainRecord, Record, RecordType};
use crate::schedule::ScheduledTask;
use crate::traits::{DnsProvider, DomainSource, PublicIpSource};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Capacity of the engine event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A reconciliation pass started
    PassStarted,

    /// A missing record was created
    RecordCreated {
        zone: String,
        name: String,
        record_type: RecordType,
    },

    /// An existing record was updated
    RecordUpdated {
        zone: String,
        name: String,
        record_type: RecordType,
    },

    /// The record already matched the desired state
    RecordUnchanged {
        zone: String,
        name: String,
        record_type: RecordType,
    },

    /// A provider call for the record failed
    RecordFailed {
        zone: String,
        name: String,
        record_type: RecordType,
        error: String,
    },

    /// An unknown record was deleted
    RecordPurged {
        zone: String,
        name: String,
        record_type: RecordType,
    },

    /// A reconciliation pass finished
    PassFinished(PassSummary),
}

/// Counters for one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Domains after merging
    pub domains: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub purged: usize,
}

/// One sync target: a zone and the provider that serves it
pub struct ZoneTarget {
    pub zone: Zone,
    pub provider: Box<dyn DnsProvider>,
}

impl ZoneTarget {
    pub fn new(zone: Zone, provider: Box<dyn DnsProvider>) -> Self {
        Self { zone, provider }
    }
}

/// Result of reconciling one (domain, type) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created,
    Updated,
    Unchanged,
    Failed,
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Optionally attach a [`DomainSource`]
/// 3. Call [`SyncEngine::sync()`] directly, or hand the engine to a
///    [`Scheduler`](crate::schedule::Scheduler) as its task
///
/// The engine keeps no state between passes; the providers are the only
/// source of truth for what exists.
pub struct SyncEngine {
    dns: DnsConfig,
    static_domains: Vec<DomainRecord>,
    targets: Vec<ZoneTarget>,
    ip_source: Box<dyn PublicIpSource>,
    domain_source: Option<Box<dyn DomainSource>>,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `dns`: Zone-wide DNS behaviour
    /// - `static_domains`: Domain records from configuration
    /// - `targets`: Zones to sync, in order
    /// - `ip_source`: Public IP lookup
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        dns: DnsConfig,
        static_domains: Vec<DomainRecord>,
        targets: Vec<ZoneTarget>,
        ip_source: Box<dyn PublicIpSource>,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        if targets.is_empty() {
            return Err(Error::config("No zones configured"));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            dns,
            static_domains,
            targets,
            ip_source,
            domain_source: None,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Attach a source of dynamically discovered domain records
    pub fn with_domain_source(mut self, source: Box<dyn DomainSource>) -> Self {
        self.domain_source = Some(source);
        self
    }

    /// Zones this engine syncs
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.targets.iter().map(|target| &target.zone)
    }

    /// Run one reconciliation pass over every zone
    pub async fn sync(&self) -> PassSummary {
        debug!("Starting DNS update pass");
        self.emit_event(EngineEvent::PassStarted);

        let static_domains = self.static_domains.clone();
        debug!(domains = ?static_domains, "Static config");

        let dynamic_domains = match &self.domain_source {
            Some(source) => match source.domains().await {
                Ok(domains) => {
                    debug!(domains = ?domains, "Dynamic config");
                    domains
                }
                Err(e) => {
                    error!(error = %e, "Could not fetch dynamic domains, ignoring them");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let mut domains = merge_domains(static_domains, dynamic_domains);

        if domains.is_empty() {
            info!("Found no records to update");
        } else {
            let (ip4, ip6) = self.public_ips().await;
            apply_defaults(&mut domains, &self.dns, &ip4, &ip6);
            debug!(domains = ?domains, "Applied defaults");
        }

        let mut summary = PassSummary {
            domains: domains.len(),
            ..PassSummary::default()
        };

        for target in &self.targets {
            let zone_domains = filter_domains(&domains, &target.zone.name);
            let zone_key = target.zone.key();

            debug!(zone = %zone_key, domains = zone_domains.len(), "Starting zone update");
            self.update_records(target, &zone_domains, &mut summary).await;

            if self.dns.purge_unknown {
                debug!(zone = %zone_key, "Starting purge of unknown records");
                summary.purged += self.purge_unknown_records(target, &zone_domains).await;
            }
        }

        info!(
            domains = summary.domains,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            purged = summary.purged,
            "Finished DNS update pass"
        );
        self.emit_event(EngineEvent::PassFinished(summary.clone()));

        summary
    }

    /// Look up the public addresses for enabled families; failures yield ""
    async fn public_ips(&self) -> (String, String) {
        let mut ip4 = String::new();
        let mut ip6 = String::new();

        if self.dns.enable_ip4 {
            match self.ip_source.public_ipv4().await {
                Ok(ip) => {
                    debug!(ip = %ip, "Got public IPv4 address");
                    ip4 = ip;
                }
                Err(e) => warn!(
                    error = %e,
                    "Could not fetch public IPv4 address, only static entries will be set"
                ),
            }
        }

        if self.dns.enable_ip6 {
            match self.ip_source.public_ipv6().await {
                Ok(ip) => {
                    debug!(ip = %ip, "Got public IPv6 address");
                    ip6 = ip;
                }
                Err(e) => warn!(
                    error = %e,
                    "Could not fetch public IPv6 address, only static entries will be set"
                ),
            }
        }

        (ip4, ip6)
    }

    /// Reconcile every applicable record type of every domain in a zone
    async fn update_records(
        &self,
        target: &ZoneTarget,
        domains: &[DomainRecord],
        summary: &mut PassSummary,
    ) {
        let zone_key = target.zone.key();

        for domain in domains {
            for record_type in record_types_for(domain, &self.dns, zone_key) {
                match self.update_record(target, domain, record_type).await {
                    Outcome::Created => summary.created += 1,
                    Outcome::Updated => summary.updated += 1,
                    Outcome::Unchanged => summary.unchanged += 1,
                    Outcome::Failed => summary.failed += 1,
                }
            }
        }
    }

    /// Reconcile one (domain, type) pair
    async fn update_record(
        &self,
        target: &ZoneTarget,
        domain: &DomainRecord,
        record_type: RecordType,
    ) -> Outcome {
        let zone_key = target.zone.key();
        let provider = target.provider.as_ref();

        let existing = match provider.get(&domain.name, record_type).await {
            Ok(existing) => existing.filter(Record::exists),
            Err(e) => {
                error!(
                    zone = %zone_key,
                    name = %domain.name,
                    record_type = %record_type,
                    error = %e,
                    "Failed to fetch existing record, skipping"
                );
                return self.failed(zone_key, domain, record_type, &e);
            }
        };

        let mut desired = domain.desired_record(record_type, zone_key);

        let applied = match existing {
            Some(existing) if existing.matches(&desired) => {
                debug!(
                    zone = %zone_key,
                    name = %domain.name,
                    record_type = %record_type,
                    "Record up to date, skipping"
                );
                self.emit_event(EngineEvent::RecordUnchanged {
                    zone: zone_key.to_string(),
                    name: domain.name.clone(),
                    record_type,
                });
                return Outcome::Unchanged;
            }
            Some(existing) => {
                desired.id = existing.id;
                provider
                    .update(desired.clone())
                    .await
                    .map(|record| (Outcome::Updated, record))
            }
            None => provider
                .create(desired.clone())
                .await
                .map(|record| (Outcome::Created, record)),
        };

        match applied {
            Ok((outcome, record)) => {
                let action = if outcome == Outcome::Created {
                    "Created record"
                } else {
                    "Updated record"
                };
                info!(
                    zone = %zone_key,
                    name = %record.name,
                    record_type = %record.record_type,
                    content = %record.content,
                    ttl = record.ttl,
                    proxied = record.proxied,
                    comment = %record.comment,
                    source = desired.source.as_str(),
                    container = %desired.container_name,
                    "{}",
                    action
                );

                let (zone, name) = (zone_key.to_string(), domain.name.clone());
                self.emit_event(if outcome == Outcome::Created {
                    EngineEvent::RecordCreated { zone, name, record_type }
                } else {
                    EngineEvent::RecordUpdated { zone, name, record_type }
                });
                outcome
            }
            Err(e) => {
                error!(
                    zone = %zone_key,
                    name = %desired.name,
                    record_type = %record_type,
                    content = %desired.content,
                    ttl = desired.ttl,
                    proxied = desired.proxied,
                    error = %e,
                    "Failed to apply record"
                );
                self.failed(zone_key, domain, record_type, &e)
            }
        }
    }

    fn failed(
        &self,
        zone_key: &str,
        domain: &DomainRecord,
        record_type: RecordType,
        error: &Error,
    ) -> Outcome {
        self.emit_event(EngineEvent::RecordFailed {
            zone: zone_key.to_string(),
            name: domain.name.clone(),
            record_type,
            error: error.to_string(),
        });
        Outcome::Failed
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // A closed receiver means nobody is listening; only a full one is worth a warning
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event");
        }
    }
}

#[async_trait]
impl ScheduledTask for SyncEngine {
    async fn run(&self) {
        self.sync().await;
    }
}

/// Record types to reconcile for a domain in a zone.
///
/// A CNAME excludes A and AAAA for the same name. A and AAAA need the
/// domain's own address; a zone override alone does not publish one.
fn record_types_for(domain: &DomainRecord, dns: &DnsConfig, zone_key: &str) -> Vec<RecordType> {
    if domain.has_cname_for_zone(zone_key) {
        return vec![RecordType::Cname];
    }

    let mut types = Vec::with_capacity(2);
    if dns.enable_ip4 && !domain.ip4.trim().is_empty() {
        types.push(RecordType::A);
    }
    if dns.enable_ip6 && !domain.ip6.trim().is_empty() {
        types.push(RecordType::Aaaa);
    }
    types
}

/// Combine static and dynamic domain records.
///
/// Static entries come first and win on an exact name collision.
pub fn merge_domains(
    static_domains: Vec<DomainRecord>,
    dynamic_domains: Vec<DomainRecord>,
) -> Vec<DomainRecord> {
    let static_count = static_domains.len();
    let mut merged = static_domains;

    for domain in dynamic_domains {
        if merged[..static_count].iter().any(|d| d.name == domain.name) {
            info!(
                name = %domain.name,
                container = %domain.container_name,
                "Found duplicate domain config, using static configuration"
            );
        } else {
            merged.push(domain);
        }
    }

    merged
}

/// Fill missing addresses and TTLs in place.
///
/// A CNAME clears any configured address. Blank public addresses leave the
/// field blank, so no record of that type is attempted.
pub fn apply_defaults(domains: &mut [DomainRecord], dns: &DnsConfig, public_ip4: &str, public_ip6: &str) {
    for domain in domains.iter_mut() {
        if !domain.cname.trim().is_empty() {
            domain.ip4.clear();
            domain.ip6.clear();
        } else {
            if dns.enable_ip4 && domain.ip4.trim().is_empty() {
                domain.ip4 = public_ip4.to_string();
            }
            if dns.enable_ip6 && domain.ip6.trim().is_empty() {
                domain.ip6 = public_ip6.to_string();
            }
        }

        if domain.ttl == 0 {
            domain.ttl = dns.default_ttl;
        }
    }
}

/// Domains routed to a zone: plain suffix match on the zone name
pub fn filter_domains(domains: &[DomainRecord], zone_name: &str) -> Vec<DomainRecord> {
    domains
        .iter()
        .filter(|domain| domain.name.ends_with(zone_name))
        .cloned()
        .collect()
}
