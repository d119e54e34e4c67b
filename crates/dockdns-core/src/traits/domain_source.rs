// # Domain Source Trait
//
// Supplies dynamically discovered domain records (e.g. from container
// labels). Static configuration always wins over these on name collision.
//
// ## Implementations
//
// - Docker labels: `dockdns-docker` crate

use crate::record::DomainRecord;
use async_trait::async_trait;

/// Trait for dynamic domain record sources
#[async_trait]
pub trait DomainSource: Send + Sync {
    /// Fetch the current set of domain records
    ///
    /// An error makes the engine fall back to static records for this pass.
    async fn domains(&self) -> Result<Vec<DomainRecord>, crate::Error>;
}
