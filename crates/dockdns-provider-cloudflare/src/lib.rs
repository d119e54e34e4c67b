// # Cloudflare DNS Provider
//
// Cloudflare API v4 backend for the DockDNS agent.
//
// ## Behavior
//
// - One HTTP request per trait call, plus a one-time zone lookup when no
//   zone ID is configured
// - Errors are returned to the engine as-is; the next pass retries
// - HTTP status codes map to specific errors (401/403, 404, 429, 5xx)
// - `get` reports a missing record as `Ok(None)`
// - Dry-run is handled by `dockdns_core::DryRunProvider`, not here
//
// ## Trust Level: Untrusted (DNS Provider)
//
// - ✅ Perform HTTP/HTTPS API calls to the Cloudflare API only
// - ✅ Parse provider-specific responses
// - ❌ Spawn tasks or threads
// - ❌ Retry, back off or cache records
// - ❌ Decide whether a write is needed (owned by `SyncEngine`)
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Provider MUST fail fast if the token is empty
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&page=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dockdns_core::config::Zone;
use dockdns_core::traits::{DnsProvider, DnsProviderFactory};
use dockdns_core::{Error, ProviderRegistry, Record, RecordType, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing
const PAGE_SIZE: u32 = 100;

const PROVIDER_NAME: &str = "cloudflare";

/// Record types listed by [`CloudflareProvider::list`]
const MANAGED_TYPES: [RecordType; 3] = [RecordType::A, RecordType::Aaaa, RecordType::Cname];

/// Response envelope shared by every v4 endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    page: u32,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ZoneResult {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecordResult {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    #[serde(default)]
    proxied: bool,
    #[serde(default)]
    ttl: u32,
    #[serde(default)]
    comment: Option<String>,
}

impl DnsRecordResult {
    /// Convert to a [`Record`]; record types the agent does not manage yield `None`
    fn into_record(self) -> Option<Record> {
        let record_type = self.record_type.parse::<RecordType>().ok()?;
        Some(
            Record::new(self.name, record_type, self.content)
                .with_id(self.id)
                .with_ttl(self.ttl)
                .with_proxied(self.proxied)
                .with_comment(self.comment.unwrap_or_default()),
        )
    }
}

/// Request body for create and update
#[derive(Debug, Serialize)]
struct DnsRecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
    comment: &'a str,
}

impl<'a> From<&'a Record> for DnsRecordBody<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            record_type: record.record_type.as_str(),
            name: &record.name,
            content: &record.content,
            ttl: record.ttl,
            proxied: record.proxied,
            comment: &record.comment,
        }
    }
}

impl<T> ApiResponse<T> {
    /// Fail on `success: false` even when the HTTP status was 2xx
    fn check(self, context: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let messages = self
            .errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::provider(
            PROVIDER_NAME,
            format!("{context} failed: {messages}"),
        ))
    }

    fn into_result(self, context: &str) -> Result<T> {
        self.result.ok_or_else(|| {
            Error::provider(
                PROVIDER_NAME,
                format!("{context}: response has no result"),
            )
        })
    }
}

/// Map a non-2xx HTTP status to an error
fn status_error(status: reqwest::StatusCode, body: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{context}: invalid API token or insufficient permissions. Status: {status}"
        )),
        404 => Error::not_found(format!("{context}: {status}")),
        429 => Error::rate_limited(format!(
            "{context}: rate limit exceeded. Status: {status}"
        )),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("{context}: Cloudflare server error (transient): {status} - {body}"),
        ),
        _ => Error::provider(PROVIDER_NAME, format!("{context}: {status} - {body}")),
    }
}

/// Cloudflare DNS provider for one zone
///
/// # Zone ID
///
/// A configured zone ID is used as-is. Otherwise the ID is looked up by
/// exact zone name on first use and kept for the provider's lifetime.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    zone_name: String,

    zone_id: OnceCell<String>,

    base_url: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_name", &self.zone_name)
            .field("zone_id", &self.zone_id.get())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider for a zone
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_name`: Zone name, used to look up the zone ID when not given
    /// - `zone_id`: Optional zone ID
    pub fn new(
        api_token: impl Into<String>,
        zone_name: impl Into<String>,
        zone_id: Option<String>,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        let zone_id = match zone_id.filter(|id| !id.is_empty()) {
            Some(id) => OnceCell::new_with(Some(id)),
            None => OnceCell::new(),
        };

        Ok(Self {
            api_token,
            zone_name: zone_name.into(),
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the provider at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn zone_id(&self) -> Result<&str> {
        self.zone_id
            .get_or_try_init(|| self.lookup_zone_id())
            .await
            .map(String::as_str)
    }

    /// Find the zone whose name matches exactly
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn lookup_zone_id(&self) -> Result<String> {
        tracing::debug!(zone = %self.zone_name, "Looking up Cloudflare zone ID");

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", self.zone_name.as_str())]);
        let zones: Vec<ZoneResult> = self
            .execute(request, "Zone lookup")
            .await?
            .into_result("Zone lookup")?;

        let zone = zones
            .into_iter()
            .find(|z| z.name == self.zone_name)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", self.zone_name)))?;

        tracing::debug!(zone = %self.zone_name, zone_id = %zone.id, "Found Cloudflare zone ID");
        Ok(zone.id)
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }

    async fn record_url(&self, record: &Record, action: &str) -> Result<String> {
        if !record.exists() {
            return Err(Error::invalid_input(format!(
                "Cannot {action} {} ({}) without a record ID",
                record.name, record.record_type
            )));
        }
        let zone_id = self.zone_id().await?;
        Ok(format!("{}/{}", self.records_url(zone_id), record.id))
    }

    /// Send an authenticated request and decode the envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<ApiResponse<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{context}: HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &body, context));
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::provider(
                PROVIDER_NAME,
                format!("{context}: failed to parse response: {e}"),
            )
        })?;
        envelope.check(context)
    }

    async fn list_type(&self, zone_id: &str, record_type: RecordType) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let per_page = PAGE_SIZE.to_string();
        let mut page: u32 = 1;

        loop {
            let page_param = page.to_string();
            let request = self.client.get(self.records_url(zone_id)).query(&[
                ("type", record_type.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page_param.as_str()),
            ]);
            let response: ApiResponse<Vec<DnsRecordResult>> =
                self.execute(request, "List records").await?;

            let info = response.result_info.as_ref().map(|i| (i.page, i.total_pages));
            records.extend(
                response
                    .result
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(DnsRecordResult::into_record),
            );

            match info {
                Some((current, total)) if current < total => page = current + 1,
                _ => break,
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list(&self) -> Result<Vec<Record>> {
        let zone_id = self.zone_id().await?;
        let mut records = Vec::new();
        for record_type in MANAGED_TYPES {
            records.extend(self.list_type(zone_id, record_type).await?);
        }
        tracing::debug!(zone = %self.zone_name, count = records.len(), "Listed Cloudflare records");
        Ok(records)
    }

    async fn get(&self, name: &str, record_type: RecordType) -> Result<Option<Record>> {
        let zone_id = self.zone_id().await?;
        let request = self
            .client
            .get(self.records_url(zone_id))
            .query(&[("type", record_type.as_str()), ("name.exact", name)]);

        let records: Vec<DnsRecordResult> = self
            .execute(request, "Get record")
            .await?
            .result
            .unwrap_or_default();

        Ok(records.into_iter().find_map(DnsRecordResult::into_record))
    }

    async fn create(&self, record: Record) -> Result<Record> {
        let zone_id = self.zone_id().await?;
        let request = self
            .client
            .post(self.records_url(zone_id))
            .json(&DnsRecordBody::from(&record));

        let created: DnsRecordResult = self
            .execute(request, "Create record")
            .await?
            .into_result("Create record")?;

        Ok(record.with_id(created.id))
    }

    async fn update(&self, record: Record) -> Result<Record> {
        let url = self.record_url(&record, "update").await?;
        let request = self.client.put(url).json(&DnsRecordBody::from(&record));

        self.execute::<serde_json::Value>(request, "Update record")
            .await?;
        Ok(record)
    }

    async fn delete(&self, record: &Record) -> Result<()> {
        let url = self.record_url(record, "delete").await?;
        self.execute::<serde_json::Value>(self.client.delete(url), "Delete record")
            .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Cloudflare providers
///
/// Reads `api_token` and `zone_id` from the zone. The optional
/// `api_base` setting overrides the API base URL.
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, zone: &Zone) -> Result<Box<dyn DnsProvider>> {
        let api_token = zone
            .api_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "Cloudflare zone '{}' requires an api_token",
                    zone.name
                ))
            })?;

        let mut provider = CloudflareProvider::new(api_token, &zone.name, zone.zone_id.clone())?;
        if let Some(base_url) = zone.settings.get("api_base") {
            provider = provider.with_base_url(base_url);
        }
        Ok(Box::new(provider))
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use dockdns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dockdns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(CloudflareFactory));
}
