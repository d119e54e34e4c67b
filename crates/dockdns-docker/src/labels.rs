//! Container label mapping
//!
//! Labels map onto [`DomainRecord`] fields through two fixed tables:
//!
//! | Label                      | Field            |
//! |----------------------------|------------------|
//! | `dockdns.name`             | name(s), comma separated |
//! | `dockdns.a` / `.aaaa`      | ip4 / ip6        |
//! | `dockdns.cname`            | cname            |
//! | `dockdns.ttl`              | ttl              |
//! | `dockdns.proxied`          | proxied          |
//! | `dockdns.comment`          | comment          |
//!
//! Per-zone overrides use `dockdns.<zoneKey>.<field>`, or the legacy
//! `dockdns.<field>.<zoneKey>`. Zone keys may contain dots
//! (`dockdns.example.com.ttl`).
//!
//! A base label that fails to parse rejects the whole container. An invalid
//! override is dropped with a warning. Empty values are ignored everywhere.

use crate::ContainerSummary;
use dockdns_core::{DomainRecord, RecordSource};
use std::collections::HashMap;
use tracing::warn;

/// Label every managed container carries
pub const NAME_LABEL: &str = "dockdns.name";

const LABEL_PREFIX: &str = "dockdns.";

/// Length of a short container ID
const SHORT_ID_LEN: usize = 12;

type FieldSetter = fn(&mut DomainRecord, &str) -> Result<(), String>;

type OverrideSetter = fn(&mut DomainRecord, &str, &str) -> Result<(), String>;

const FIELD_LABELS: &[(&str, FieldSetter)] = &[
    (NAME_LABEL, set_name),
    ("dockdns.a", set_ip4),
    ("dockdns.aaaa", set_ip6),
    ("dockdns.cname", set_cname),
    ("dockdns.ttl", set_ttl),
    ("dockdns.proxied", set_proxied),
    ("dockdns.comment", set_comment),
];

const OVERRIDE_FIELDS: &[(&str, OverrideSetter)] = &[
    ("a", override_ip4),
    ("aaaa", override_ip6),
    ("cname", override_cname),
    ("ttl", override_ttl),
    ("proxied", override_proxied),
    ("comment", override_comment),
];

fn set_name(record: &mut DomainRecord, value: &str) -> Result<(), String> {
    record.name = value.to_string();
    Ok(())
}

fn set_ip4(record: &mut DomainRecord, value: &str) -> Result<(), String> {
    record.ip4 = value.to_string();
    Ok(())
}

fn set_ip6(record: &mut DomainRecord, value: &str) -> Result<(), String> {
    record.ip6 = value.to_string();
    Ok(())
}

fn set_cname(record: &mut DomainRecord, value: &str) -> Result<(), String> {
    record.cname = value.to_string();
    Ok(())
}

fn set_ttl(record: &mut DomainRecord, value: &str) -> Result<(), String> {
    record.ttl = parse_ttl(value)?;
    Ok(())
}

fn set_proxied(record: &mut DomainRecord, value: &str) -> Result<(), String> {
    record.proxied = parse_bool(value)?;
    Ok(())
}

fn set_comment(record: &mut DomainRecord, value: &str) -> Result<(), String> {
    record.comment = value.to_string();
    Ok(())
}

fn override_ip4(record: &mut DomainRecord, zone: &str, value: &str) -> Result<(), String> {
    record
        .ip4_overrides
        .get_or_insert_with(HashMap::new)
        .insert(zone.to_string(), value.to_string());
    Ok(())
}

fn override_ip6(record: &mut DomainRecord, zone: &str, value: &str) -> Result<(), String> {
    record
        .ip6_overrides
        .get_or_insert_with(HashMap::new)
        .insert(zone.to_string(), value.to_string());
    Ok(())
}

fn override_cname(record: &mut DomainRecord, zone: &str, value: &str) -> Result<(), String> {
    record
        .cname_overrides
        .get_or_insert_with(HashMap::new)
        .insert(zone.to_string(), value.to_string());
    Ok(())
}

fn override_ttl(record: &mut DomainRecord, zone: &str, value: &str) -> Result<(), String> {
    let ttl = parse_ttl(value)?;
    record
        .ttl_overrides
        .get_or_insert_with(HashMap::new)
        .insert(zone.to_string(), ttl);
    Ok(())
}

fn override_proxied(record: &mut DomainRecord, zone: &str, value: &str) -> Result<(), String> {
    let proxied = parse_bool(value)?;
    record
        .proxied_overrides
        .get_or_insert_with(HashMap::new)
        .insert(zone.to_string(), proxied);
    Ok(())
}

fn override_comment(record: &mut DomainRecord, zone: &str, value: &str) -> Result<(), String> {
    record
        .comment_overrides
        .get_or_insert_with(HashMap::new)
        .insert(zone.to_string(), value.to_string());
    Ok(())
}

/// Parse a boolean the way Docker users write them in labels
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("invalid boolean: {other}")),
    }
}

fn parse_ttl(value: &str) -> Result<u32, String> {
    value
        .parse::<u32>()
        .map_err(|e| format!("invalid ttl {value}: {e}"))
}

/// Split an override label into zone key and setter
fn split_override(label: &str) -> Option<(&str, OverrideSetter)> {
    let rest = label.strip_prefix(LABEL_PREFIX)?;

    // dockdns.<zoneKey>.<field>
    let current = OVERRIDE_FIELDS.iter().find_map(|(field, setter)| {
        rest.strip_suffix(field)
            .and_then(|zone| zone.strip_suffix('.'))
            .filter(|zone| !zone.is_empty())
            .map(|zone| (zone, *setter))
    });

    // dockdns.<field>.<zoneKey>
    current.or_else(|| {
        OVERRIDE_FIELDS.iter().find_map(|(field, setter)| {
            rest.strip_prefix(field)
                .and_then(|zone| zone.strip_prefix('.'))
                .filter(|zone| !zone.is_empty())
                .map(|zone| (zone, *setter))
        })
    })
}

/// Build a record from one container's labels
///
/// The returned record's `name` is the raw `dockdns.name` value and may
/// list several names.
pub fn record_from_labels(labels: &HashMap<String, String>) -> Result<DomainRecord, String> {
    let mut record = DomainRecord::default();

    for (label, setter) in FIELD_LABELS {
        if let Some(value) = labels.get(*label).filter(|v| !v.is_empty()) {
            setter(&mut record, value)
                .map_err(|e| format!("label {label}={value}: {e}"))?;
        }
    }

    let mut keys: Vec<&String> = labels.keys().collect();
    keys.sort();
    for label in keys {
        let value = &labels[label];
        if value.is_empty() {
            continue;
        }
        let Some((zone, setter)) = split_override(label) else {
            continue;
        };
        if let Err(e) = setter(&mut record, zone, value) {
            warn!(label = %label, value = %value, error = %e, "Ignoring invalid override label");
        }
    }

    Ok(record)
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Map containers to domain records, one per listed name
pub fn domains_from_containers(containers: &[ContainerSummary]) -> Vec<DomainRecord> {
    let mut domains = Vec::new();

    for container in containers {
        let container_name = container
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default();

        let record = match record_from_labels(&container.labels) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    container = %container_name,
                    error = %e,
                    "Error parsing label configuration, skipping container"
                );
                continue;
            }
        };

        let template = DomainRecord {
            source: RecordSource::Docker,
            container_id: short_id(&container.id).to_string(),
            container_name,
            ..record
        };

        for name in template.name.split(',').map(str::trim) {
            if name.is_empty() {
                continue;
            }
            domains.push(DomainRecord {
                name: name.to_string(),
                ..template.clone()
            });
        }
    }

    domains
}
