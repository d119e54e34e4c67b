//! Tracing subscriber setup

use anyhow::{Result, anyhow};
use dockdns_core::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Build the level filter; `RUST_LOG` overrides the configured level
fn filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))
}

/// Install the global subscriber
pub fn init(config: &LogConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter(config)?);

    let result = match config.format {
        LogFormat::Simple => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))
}
