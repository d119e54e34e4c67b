// # HTTP IP Source
//
// Public IP lookup for the DockDNS agent through Cloudflare's trace endpoint.
//
// ## Architecture
//
// The trace endpoint answers with `key=value` lines, one of which is the
// caller's address (`ip=203.0.113.7`). To learn each family's address, the
// request goes out through a client whose local address is pinned to
// `0.0.0.0` (IPv4) or `::` (IPv6), so the connection can only use that family.
//
// Lookups are single-shot: no caching and no background polling. The engine
// asks once per pass.

use async_trait::async_trait;
use dockdns_core::traits::PublicIpSource;
use dockdns_core::{Error, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Cloudflare trace endpoint
pub const DEFAULT_TRACE_URL: &str = "https://www.cloudflare.com/cdn-cgi/trace";

/// Default HTTP timeout for lookups (10 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Address family of a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    V4,
    V6,
}

impl Family {
    fn unspecified(self) -> IpAddr {
        match self {
            Family::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Family::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    fn matches(self, ip: &IpAddr) -> bool {
        match self {
            Family::V4 => ip.is_ipv4(),
            Family::V6 => ip.is_ipv6(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Family::V4 => "IPv4",
            Family::V6 => "IPv6",
        }
    }
}

/// Public IP source backed by a `cdn-cgi/trace` endpoint
#[derive(Debug, Clone)]
pub struct TraceIpSource {
    url: String,
    ipv4_client: reqwest::Client,
    ipv6_client: reqwest::Client,
}

impl TraceIpSource {
    /// Create a source querying the Cloudflare trace endpoint
    pub fn new() -> Result<Self> {
        Ok(Self {
            url: DEFAULT_TRACE_URL.to_string(),
            ipv4_client: build_client(Family::V4)?,
            ipv6_client: build_client(Family::V6)?,
        })
    }

    /// Query a different trace endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn lookup(&self, family: Family) -> Result<String> {
        let client = match family {
            Family::V4 => &self.ipv4_client,
            Family::V6 => &self.ipv6_client,
        };

        let response = client.get(&self.url).send().await.map_err(|e| {
            Error::ip_lookup(format!("{} request failed: {}", family.label(), e))
        })?;

        if !response.status().is_success() {
            return Err(Error::ip_lookup(format!(
                "{} lookup returned HTTP {}",
                family.label(),
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| {
            Error::ip_lookup(format!("Failed to read {} response: {}", family.label(), e))
        })?;

        let ip = parse_trace(&body)
            .ok_or_else(|| Error::ip_lookup("No ip= line in trace response"))?;

        let addr: IpAddr = ip
            .parse()
            .map_err(|_| Error::ip_lookup(format!("Invalid IP address: {}", ip)))?;

        if !family.matches(&addr) {
            return Err(Error::ip_lookup(format!(
                "Expected {}, got: {}",
                family.label(),
                addr
            )));
        }

        tracing::debug!(family = family.label(), ip = %addr, "Resolved public IP");
        Ok(addr.to_string())
    }
}

fn build_client(family: Family) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .local_address(family.unspecified())
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}

/// Extract the value of the `ip=` line from a trace response
pub fn parse_trace(body: &str) -> Option<&str> {
    body.lines()
        .find_map(|line| line.trim().strip_prefix("ip="))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
}

#[async_trait]
impl PublicIpSource for TraceIpSource {
    async fn public_ipv4(&self) -> Result<String> {
        self.lookup(Family::V4).await
    }

    async fn public_ipv6(&self) -> Result<String> {
        self.lookup(Family::V6).await
    }
}
