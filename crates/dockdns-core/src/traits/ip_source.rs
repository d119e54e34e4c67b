// # Public IP Source Trait
//
// Resolves the host's public addresses. Records without an explicit
// address are filled in from here on every pass.
//
// ## Implementations
//
// - Cloudflare trace endpoint: `dockdns-ip-http` crate

use async_trait::async_trait;

/// Trait for public IP lookups
///
/// A failed lookup is never fatal to a pass: the engine logs it and leaves
/// the affected records without an address for that pass.
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// Current public IPv4 address
    async fn public_ipv4(&self) -> Result<String, crate::Error>;

    /// Current public IPv6 address
    async fn public_ipv6(&self) -> Result<String, crate::Error>;
}
