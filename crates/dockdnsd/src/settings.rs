//! Configuration loading
//!
//! A TOML file overlaid with `DOCKDNS_*` environment variables. Nested keys
//! use `__`: `DOCKDNS_DNS__PURGE_UNKNOWN=true` sets `dns.purge_unknown`.

use anyhow::{Context, Result};
use dockdns_core::AppConfig;
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DOCKDNS";

/// Load and validate the configuration
pub fn load(path: &Path) -> Result<AppConfig> {
    let config: AppConfig = config::Config::builder()
        .add_source(config::File::from(path.to_path_buf()))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read {}", path.display()))?
        .try_deserialize()
        .context("Invalid configuration")?;

    config.validate()?;
    Ok(config)
}
