// # DNS Provider Trait
//
// Defines the interface every DNS backend implements.
//
// ## Implementations
//
// - Cloudflare: `dockdns-provider-cloudflare` crate
// - Dry-run decorator: `crate::provider::DryRunProvider`
//
// ## Usage
//
// ```rust,ignore
// use dockdns_core::{DnsProvider, Record, RecordType};
//
// async fn ensure(provider: &dyn DnsProvider) -> dockdns_core::Result<()> {
//     let desired = Record::new("app.example.com", RecordType::A, "10.0.0.1").with_ttl(300);
//     match provider.get("app.example.com", RecordType::A).await? {
//         Some(existing) => provider.update(desired.with_id(existing.id)).await?,
//         None => provider.create(desired).await?,
//     };
//     Ok(())
// }
// ```

use crate::record::{Record, RecordType};
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// The reconciliation engine is the only caller. It decides what to create,
/// update or delete; a provider only executes the call it is given.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS (or DNS UPDATE) calls to their backend only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads (violates shutdown determinism)
/// - ❌ Implement retry logic or backoff (the next debounced pass retries)
/// - ❌ Decide whether a write is needed (owned by `SyncEngine`)
/// - ❌ Cache records across calls (the backend is the source of truth)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record of a managed type (A, AAAA, CNAME) in the zone
    async fn list(&self) -> Result<Vec<Record>, crate::Error>;

    /// Fetch one record by name and type
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: the record exists
    /// - `Ok(None)`: no such record; the engine will create it
    /// - `Err(Error)`: the lookup failed
    async fn get(&self, name: &str, record_type: RecordType)
    -> Result<Option<Record>, crate::Error>;

    /// Create a record; `record.id` is empty on input
    async fn create(&self, record: Record) -> Result<Record, crate::Error>;

    /// Update the record identified by `record.id`
    async fn update(&self, record: Record) -> Result<Record, crate::Error>;

    /// Delete the record identified by `record.id`
    async fn delete(&self, record: &Record) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from zone configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance for a zone
    fn create(&self, zone: &crate::config::Zone) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
