//! Deletion of provider records no domain record accounts for

use super::{EngineEvent, SyncEngine, ZoneTarget};
use crate::config::DnsConfig;
use crate::record::{DomainRecord, Record, RecordType};
use tracing::{error, info};

/// Whether a provider record is accounted for by the desired domains.
///
/// A name with a CNAME in this zone only accounts for its CNAME record; A
/// and AAAA records for that name are stale. Otherwise A and AAAA records
/// are known while their address family is enabled.
pub fn is_known(domains: &[DomainRecord], record: &Record, dns: &DnsConfig, zone_key: &str) -> bool {
    domains
        .iter()
        .filter(|domain| domain.name == record.name)
        .any(|domain| {
            if domain.has_cname_for_zone(zone_key) {
                record.record_type == RecordType::Cname
            } else {
                match record.record_type {
                    RecordType::A => dns.enable_ip4,
                    RecordType::Aaaa => dns.enable_ip6,
                    RecordType::Cname => false,
                }
            }
        })
}

impl SyncEngine {
    /// Delete every record in the zone that is not known.
    ///
    /// Returns the number of deleted records.
    pub(super) async fn purge_unknown_records(&self, target: &ZoneTarget, domains: &[DomainRecord]) -> usize {
        let zone_key = target.zone.key();

        let existing = match target.provider.list().await {
            Ok(records) => records,
            Err(e) => {
                error!(zone = %zone_key, error = %e, "Failed to fetch existing records, skipping purge");
                return 0;
            }
        };

        let mut purged = 0;
        for record in existing
            .iter()
            .filter(|record| !is_known(domains, record, &self.dns, zone_key))
        {
            match target.provider.delete(record).await {
                Ok(()) => {
                    info!(
                        zone = %zone_key,
                        name = %record.name,
                        record_type = %record.record_type,
                        content = %record.content,
                        "Purged unknown record"
                    );
                    self.emit_event(EngineEvent::RecordPurged {
                        zone: zone_key.to_string(),
                        name: record.name.clone(),
                        record_type: record.record_type,
                    });
                    purged += 1;
                }
                Err(e) => error!(
                    zone = %zone_key,
                    name = %record.name,
                    record_type = %record.record_type,
                    error = %e,
                    "Failed to purge record"
                ),
            }
        }

        purged
    }
}
