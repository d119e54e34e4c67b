//! Plugin-based provider registry
//!
//! Backends register a factory under their provider name; zones then refer
//! to a backend by that name instead of a hard-coded match.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dockdns_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! dockdns_provider_cloudflare::register(&registry);
//!
//! for zone in &config.zones {
//!     let provider = registry.create_provider(zone, dry_run)?;
//! }
//! ```
//!
//! ## Registration
//!
//! ```rust,ignore
//! // In dockdns-provider-cloudflare
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use crate::config::Zone;
use crate::error::{Error, Result};
use crate::provider::DryRunProvider;
use crate::traits::{DnsProvider, DnsProviderFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Provider registry for plugin-based DNS provider creation
///
/// ## Thread Safety
///
/// Interior mutability with RwLock: concurrent reads, exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Box<dyn DnsProviderFactory>>> {
        // Factories are inserted whole; a poisoned map is still consistent
        self.providers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Box<dyn DnsProviderFactory>>> {
        self.providers.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider name as used in `zones[].provider` (e.g. "cloudflare")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        self.write().insert(name.into(), factory);
    }

    /// Create the provider for a zone
    ///
    /// With `dry_run`, the provider is wrapped in [`DryRunProvider`].
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If the provider name is not registered or creation fails
    pub fn create_provider(&self, zone: &Zone, dry_run: bool) -> Result<Box<dyn DnsProvider>> {
        let providers = self.read();

        let factory = providers.get(&zone.provider).ok_or_else(|| {
            Error::config(format!(
                "Unknown provider '{}' for zone '{}'",
                zone.provider, zone.name
            ))
        })?;

        let provider = factory.create(zone)?;
        if dry_run {
            Ok(Box::new(DryRunProvider::new(provider)))
        } else {
            Ok(provider)
        }
    }

    /// List all registered provider names
    pub fn list_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider name is registered
    pub fn has_provider(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordType};
    use async_trait::async_trait;

    struct NullProvider;

    #[async_trait]
    impl DnsProvider for NullProvider {
        async fn list(&self) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }

        async fn get(&self, _name: &str, _record_type: RecordType) -> Result<Option<Record>> {
            Ok(None)
        }

        async fn create(&self, _record: Record) -> Result<Record> {
            Err(Error::provider("null", "not writable"))
        }

        async fn update(&self, _record: Record) -> Result<Record> {
            Err(Error::provider("null", "not writable"))
        }

        async fn delete(&self, _record: &Record) -> Result<()> {
            Err(Error::provider("null", "not writable"))
        }

        fn provider_name(&self) -> &'static str {
            "null"
        }
    }

    struct NullFactory;

    impl DnsProviderFactory for NullFactory {
        fn create(&self, zone: &Zone) -> Result<Box<dyn DnsProvider>> {
            if zone.name == "broken.example" {
                return Err(Error::config("broken zone"));
            }
            Ok(Box::new(NullProvider))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = ProviderRegistry::new();

        assert!(!registry.has_provider("null"));
        registry.register_provider("null", Box::new(NullFactory));

        assert!(registry.has_provider("null"));
        assert_eq!(registry.list_providers(), vec!["null".to_string()]);
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let registry = ProviderRegistry::new();
        let zone = Zone::new("route53", "example.com");

        let err = registry.create_provider(&zone, false).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("route53"));
    }

    #[test]
    fn test_factory_error_propagates() {
        let registry = ProviderRegistry::new();
        registry.register_provider("null", Box::new(NullFactory));

        let zone = Zone::new("null", "broken.example");
        assert!(registry.create_provider(&zone, false).is_err());
    }

    #[tokio::test]
    async fn test_dry_run_wraps_provider() {
        let registry = ProviderRegistry::new();
        registry.register_provider("null", Box::new(NullFactory));
        let zone = Zone::new("null", "example.com");

        let plain = registry.create_provider(&zone, false).unwrap();
        assert!(plain.create(Record::new("a.example.com", RecordType::A, "10.0.0.1")).await.is_err());

        let dry = registry.create_provider(&zone, true).unwrap();
        assert!(dry.create(Record::new("a.example.com", RecordType::A, "10.0.0.1")).await.is_ok());
        assert_eq!(dry.provider_name(), "null");
    }
}
