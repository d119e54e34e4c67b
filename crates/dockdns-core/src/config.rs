//! Agent configuration: zones to sync, static domains, DNS and Docker options
//!
//! Loading (file + environment overlay) lives in the daemon; these types only
//! describe the shape, defaults and validation.

use crate::record::DomainRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Periodic sync interval in seconds.
    ///
    /// A negative value runs a single pass and exits.
    #[serde(default = "default_interval")]
    pub interval: i64,

    /// Quiet period after the last trigger event before a pass runs (seconds)
    #[serde(default = "default_debounce_time")]
    pub debounce_time: u64,

    /// Maximum time a burst of events may postpone a pass (seconds)
    #[serde(default = "default_max_debounce_time")]
    pub max_debounce_time: u64,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub docker: DockerConfig,

    /// Sync targets
    #[serde(default)]
    pub zones: Vec<Zone>,

    /// Static domain records
    #[serde(default)]
    pub domains: Vec<DomainRecord>,
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zones.is_empty() {
            return Err(crate::Error::config("No zones configured"));
        }

        let mut keys = HashSet::new();
        for zone in &self.zones {
            zone.validate()?;
            if !keys.insert(zone.key()) {
                return Err(crate::Error::config(format!(
                    "Duplicate zone key: {}",
                    zone.key()
                )));
            }
        }

        if self.max_debounce_time < self.debounce_time {
            return Err(crate::Error::config(format!(
                "max_debounce_time ({}s) must not be lower than debounce_time ({}s)",
                self.max_debounce_time, self.debounce_time
            )));
        }

        Ok(())
    }

    /// Whether the agent should run one pass and exit
    pub fn run_once(&self) -> bool {
        self.interval < 0
    }

    /// Periodic interval as a duration (zero when running once)
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(0).unsigned_abs())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_time)
    }

    pub fn max_debounce(&self) -> Duration {
        Duration::from_secs(self.max_debounce_time)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            debounce_time: default_debounce_time(),
            max_debounce_time: default_max_debounce_time(),
            log: LogConfig::default(),
            dns: DnsConfig::default(),
            docker: DockerConfig::default(),
            zones: Vec::new(),
            domains: Vec::new(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable text
    #[default]
    Simple,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (e.g. "info", "debug", "dockdns_core=debug,warn")
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Zone-wide DNS behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Manage A records
    #[serde(default = "default_true", rename = "a")]
    pub enable_ip4: bool,

    /// Manage AAAA records
    #[serde(default, rename = "aaaa")]
    pub enable_ip6: bool,

    /// TTL applied to records that do not set one
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Delete provider records that no domain record accounts for
    #[serde(default)]
    pub purge_unknown: bool,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enable_ip4: true,
            enable_ip6: false,
            default_ttl: default_ttl(),
            purge_unknown: false,
        }
    }
}

/// Container runtime integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Read labels and subscribe to container events
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Engine API endpoint (e.g. "unix:///var/run/docker.sock",
    /// "tcp://docker-proxy:2375"). Falls back to `DOCKER_HOST`, then the
    /// local socket.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
        }
    }
}

/// A sync target: one DNS zone at one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    /// Optional identifier used as the override key
    #[serde(default)]
    pub id: Option<String>,

    /// Provider backend name (e.g. "cloudflare")
    pub provider: String,

    /// Zone name; also the suffix used to route domains to this zone
    pub name: String,

    /// API token for token-authenticated providers
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Provider-side zone identifier, when known up front
    #[serde(default)]
    pub zone_id: Option<String>,

    /// Additional provider-specific settings
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

impl Zone {
    /// Create a zone for a provider
    pub fn new(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            provider: provider.into(),
            name: name.into(),
            api_token: None,
            zone_id: None,
            settings: HashMap::new(),
        }
    }

    /// Set the override key
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Key used to look up per-zone overrides: the ID if set, else the name
    pub fn key(&self) -> &str {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.name,
        }
    }

    /// Validate the zone configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.provider.is_empty() {
            return Err(crate::Error::config(format!(
                "Zone '{}' has no provider",
                self.name
            )));
        }
        if self.name.is_empty() {
            return Err(crate::Error::config("Zone name cannot be empty"));
        }
        Ok(())
    }
}

fn default_interval() -> i64 {
    600
}

fn default_debounce_time() -> u64 {
    10
}

fn default_max_debounce_time() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ttl() -> u32 {
    300
}

fn default_true() -> bool {
    true
}
