//! Record data model
//!
//! - [`DomainRecord`]: desired state for one name, before per-zone resolution
//! - [`Record`]: provider-side representation of a single DNS record
//! - [`RecordType`]: the record types the agent manages
//!
//! ## Override semantics
//!
//! Every override map is keyed by zone key (see [`crate::config::Zone::key`]).
//! The fields do not share one "optional" policy:
//!
//! | Field              | Key absent | Key present, empty/zero value |
//! |--------------------|------------|-------------------------------|
//! | `a`, `aaaa`, `cname` | default  | default (empty is "no override") |
//! | `ttl`, `comment`   | default    | the override (zero/empty is valid) |
//! | `proxied`          | default    | the override (`false` is valid) |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// DNS record types managed by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
    /// Canonical name record
    #[serde(rename = "CNAME")]
    Cname,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            other => Err(crate::Error::invalid_input(format!(
                "unsupported record type: {other}"
            ))),
        }
    }
}

/// Where a [`DomainRecord`] came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    /// Static configuration file entry
    #[default]
    Static,
    /// Derived from container labels
    Docker,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Static => "static",
            RecordSource::Docker => "docker",
        }
    }
}

/// Desired state for one DNS name
///
/// Recomputed on every reconciliation pass; only the pass that built it
/// mutates it (IP and TTL defaulting).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// FQDN (e.g. "app.example.com")
    pub name: String,

    /// IPv4 address for the A record
    #[serde(default, rename = "a")]
    pub ip4: String,

    /// IPv6 address for the AAAA record
    #[serde(default, rename = "aaaa")]
    pub ip6: String,

    /// CNAME target; takes precedence over `ip4`/`ip6`
    #[serde(default)]
    pub cname: String,

    /// Time-to-live; 0 means "use the configured default"
    #[serde(default)]
    pub ttl: u32,

    /// Whether the record is proxied by the provider
    #[serde(default)]
    pub proxied: bool,

    #[serde(default)]
    pub comment: String,

    #[serde(default, rename = "a_overrides", skip_serializing_if = "Option::is_none")]
    pub ip4_overrides: Option<HashMap<String, String>>,

    #[serde(default, rename = "aaaa_overrides", skip_serializing_if = "Option::is_none")]
    pub ip6_overrides: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname_overrides: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_overrides: Option<HashMap<String, u32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied_overrides: Option<HashMap<String, bool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_overrides: Option<HashMap<String, String>>,

    /// Provenance of this entry
    #[serde(default)]
    pub source: RecordSource,

    /// Short container ID for label-derived entries
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_id: String,

    /// Container name for label-derived entries
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_name: String,
}

/// Override lookup where an empty string counts as "no override".
fn non_empty_override<'a>(
    overrides: &'a Option<HashMap<String, String>>,
    zone_key: &str,
    default: &'a str,
) -> &'a str {
    match overrides.as_ref().and_then(|m| m.get(zone_key)) {
        Some(value) if !value.is_empty() => value,
        _ => default,
    }
}

/// Override lookup where presence of the key always wins.
fn present_override<T: Clone>(
    overrides: &Option<HashMap<String, T>>,
    zone_key: &str,
    default: &T,
) -> T {
    overrides
        .as_ref()
        .and_then(|m| m.get(zone_key))
        .unwrap_or(default)
        .clone()
}

impl DomainRecord {
    /// Create a static domain record with only a name set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Effective IPv4 address for a zone
    pub fn ip4_for_zone(&self, zone_key: &str) -> &str {
        non_empty_override(&self.ip4_overrides, zone_key, &self.ip4)
    }

    /// Effective IPv6 address for a zone
    pub fn ip6_for_zone(&self, zone_key: &str) -> &str {
        non_empty_override(&self.ip6_overrides, zone_key, &self.ip6)
    }

    /// Effective CNAME target for a zone
    pub fn cname_for_zone(&self, zone_key: &str) -> &str {
        non_empty_override(&self.cname_overrides, zone_key, &self.cname)
    }

    /// Effective TTL for a zone; an override of 0 is honored
    pub fn ttl_for_zone(&self, zone_key: &str) -> u32 {
        present_override(&self.ttl_overrides, zone_key, &self.ttl)
    }

    /// Effective proxied flag for a zone
    pub fn proxied_for_zone(&self, zone_key: &str) -> bool {
        present_override(&self.proxied_overrides, zone_key, &self.proxied)
    }

    /// Effective comment for a zone; an empty override is honored
    pub fn comment_for_zone(&self, zone_key: &str) -> String {
        present_override(&self.comment_overrides, zone_key, &self.comment)
    }

    /// Effective record content for a typed record in a zone
    pub fn content_for(&self, record_type: RecordType, zone_key: &str) -> &str {
        match record_type {
            RecordType::A => self.ip4_for_zone(zone_key),
            RecordType::Aaaa => self.ip6_for_zone(zone_key),
            RecordType::Cname => self.cname_for_zone(zone_key),
        }
    }

    /// Effective record content for a record type given by name.
    ///
    /// Unknown types resolve to an empty string.
    pub fn content_for_zone(&self, record_type: &str, zone_key: &str) -> &str {
        match record_type.parse::<RecordType>() {
            Ok(record_type) => self.content_for(record_type, zone_key),
            Err(_) => "",
        }
    }

    /// Whether a CNAME is configured for this zone
    pub fn has_cname_for_zone(&self, zone_key: &str) -> bool {
        !self.cname_for_zone(zone_key).trim().is_empty()
    }

    /// Build the desired provider record for a type and zone
    pub fn desired_record(&self, record_type: RecordType, zone_key: &str) -> Record {
        Record {
            id: String::new(),
            name: self.name.clone(),
            content: self.content_for(record_type, zone_key).to_string(),
            record_type,
            proxied: self.proxied_for_zone(zone_key),
            ttl: self.ttl_for_zone(zone_key),
            comment: self.comment_for_zone(zone_key),
            source: self.source,
            container_id: self.container_id.clone(),
            container_name: self.container_name.clone(),
        }
    }
}

/// A DNS record as held by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Provider-specific ID; empty when the record does not exist yet
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub proxied: bool,
    pub ttl: u32,
    #[serde(default)]
    pub comment: String,

    // Provenance, copied from the DomainRecord for logging only
    #[serde(skip)]
    pub source: RecordSource,
    #[serde(skip)]
    pub container_id: String,
    #[serde(skip)]
    pub container_name: String,
}

impl Record {
    /// Create a record with no ID and default attributes
    pub fn new(name: impl Into<String>, record_type: RecordType, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            content: content.into(),
            record_type,
            proxied: false,
            ttl: 0,
            comment: String::new(),
            source: RecordSource::default(),
            container_id: String::new(),
            container_name: String::new(),
        }
    }

    /// Set the provider ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the proxied flag
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Whether this record exists at the provider
    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }

    /// Compare the attributes the agent manages.
    ///
    /// TTL is ignored for proxied records: the provider manages it.
    pub fn matches(&self, desired: &Record) -> bool {
        self.content == desired.content
            && self.name == desired.name
            && self.proxied == desired.proxied
            && self.comment == desired.comment
            && (desired.proxied || self.ttl == desired.ttl)
    }
}
