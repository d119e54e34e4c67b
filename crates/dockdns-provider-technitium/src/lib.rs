// # Technitium DNS Provider
//
// Technitium DNS Server HTTP API backend for the DockDNS agent.
//
// ## Behavior
//
// - One HTTP request per trait call; CNAME updates are a delete plus an add
// - Authentication with a pre-created API token, or with a username and
//   password exchanged for a session token on first use
// - An expired session is refreshed once per call; a rejected API token is
//   an authentication error
// - Disabled records are invisible to `list` and `get`
// - Technitium has no record IDs: the ID is `<name>:<type>:<content>`, which
//   is what an address update needs to name the old value
//
// ## Trust Level: Untrusted (DNS Provider)
//
// - ✅ Perform HTTP/HTTPS API calls to the configured Technitium server only
// - ✅ Parse provider-specific responses
// - ❌ Spawn tasks or threads
// - ❌ Retry (beyond one session refresh), back off or cache records
// - ❌ Decide whether a write is needed (owned by `SyncEngine`)
//
// ## Security Requirements
//
// - API token, password and session token NEVER appear in logs or `Debug` output
//
// ## API Reference
//
// - Login: POST `/api/user/login`
// - List / Get: GET `/api/zones/records/get?zone=...&domain=...`
// - Create: POST `/api/zones/records/add`
// - Update: POST `/api/zones/records/update`
// - Delete: POST `/api/zones/records/delete`

use async_trait::async_trait;
use dockdns_core::config::Zone;
use dockdns_core::traits::{DnsProvider, DnsProviderFactory};
use dockdns_core::{Error, ProviderRegistry, Record, RecordType, Result};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "technitium";

const STATUS_OK: &str = "ok";
const STATUS_INVALID_TOKEN: &str = "invalid-token";

/// How the provider authenticates
#[derive(Clone)]
pub enum Credentials {
    /// Pre-created API token
    ApiToken(String),
    /// User login exchanged for a session token
    Login { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiToken(_) => f.write_str("ApiToken(<REDACTED>)"),
            Credentials::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
    response: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: String,
    token: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<ZoneRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneRecord {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    ttl: u32,
    #[serde(default)]
    r_data: RecordData,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordData {
    ip_address: Option<String>,
    cname: Option<String>,
    value: Option<String>,
}

impl ZoneRecord {
    /// Convert to a [`Record`]; disabled records and unmanaged types yield `None`
    fn into_record(self) -> Option<Record> {
        if self.disabled {
            return None;
        }
        let record_type = self.record_type.parse::<RecordType>().ok()?;
        let data = self.r_data;
        let content = match record_type {
            RecordType::A | RecordType::Aaaa => data.ip_address.unwrap_or_default(),
            RecordType::Cname => data
                .cname
                .filter(|c| !c.is_empty())
                .or(data.value)
                .unwrap_or_default(),
        };

        let id = record_id(&self.name, record_type, &content);
        Some(
            Record::new(self.name, record_type, content)
                .with_id(id)
                .with_ttl(self.ttl)
                .with_comment(self.comments.unwrap_or_default()),
        )
    }
}

fn record_id(name: &str, record_type: RecordType, content: &str) -> String {
    format!("{name}:{record_type}:{content}")
}

/// Content encoded in a record ID; IPv6 content keeps its colons
fn content_from_id(id: &str) -> Option<&str> {
    id.splitn(3, ':').nth(2)
}

/// Map a non-2xx HTTP status to an error
fn status_error(status: reqwest::StatusCode, body: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!("{context}: access denied. Status: {status}")),
        404 => Error::not_found(format!("{context}: {status}")),
        429 => Error::rate_limited(format!("{context}: rate limit exceeded. Status: {status}")),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("{context}: Technitium server error (transient): {status} - {body}"),
        ),
        _ => Error::provider(PROVIDER_NAME, format!("{context}: {status} - {body}")),
    }
}

/// Technitium DNS provider for one zone
pub struct TechnitiumProvider {
    api_url: String,

    zone: String,

    /// ⚠️ NEVER log these values
    credentials: Credentials,

    /// Session token from the last login (username/password only)
    session: Mutex<Option<String>>,

    client: reqwest::Client,
}

// Custom Debug implementation that hides credentials and the session token
impl std::fmt::Debug for TechnitiumProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TechnitiumProvider")
            .field("api_url", &self.api_url)
            .field("zone", &self.zone)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl TechnitiumProvider {
    /// Create a provider for a zone
    ///
    /// # Parameters
    ///
    /// - `api_url`: Base URL of the web console, e.g. `http://dns.lan:5380`
    /// - `zone`: Zone name as configured in Technitium
    /// - `credentials`: API token or user login
    /// - `skip_tls_verify`: Accept any TLS certificate (self-signed consoles)
    pub fn new(
        api_url: impl Into<String>,
        zone: impl Into<String>,
        credentials: Credentials,
        skip_tls_verify: bool,
    ) -> Result<Self> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let zone = zone.into();
        if api_url.is_empty() || zone.is_empty() {
            return Err(Error::config("Technitium provider requires an API URL and a zone"));
        }

        match &credentials {
            Credentials::ApiToken(token) if token.is_empty() => {
                return Err(Error::config("Technitium API token cannot be empty"));
            }
            Credentials::Login { username, password }
                if username.is_empty() || password.is_empty() =>
            {
                return Err(Error::config("Technitium login requires a username and a password"));
            }
            _ => {}
        }

        let mut builder = reqwest::Client::builder().timeout(DEFAULT_HTTP_TIMEOUT);
        if skip_tls_verify {
            tracing::warn!(zone = %zone, "Technitium TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_url,
            zone,
            credentials,
            session: Mutex::new(None),
            client,
        })
    }

    /// Exchange the user login for a session token
    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/user/login", self.api_url))
            .form(&[("user", username), ("pass", password)])
            .send()
            .await
            .map_err(|e| Error::http(format!("Login: HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &body, "Login"));
        }

        let login: LoginResponse = response.json().await.map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("Login: failed to parse response: {e}"))
        })?;

        match login.token {
            Some(token) if login.status == STATUS_OK && !token.is_empty() => {
                tracing::debug!(zone = %self.zone, "Technitium login successful");
                Ok(token)
            }
            _ => Err(Error::auth(format!(
                "Technitium login failed: {}",
                login.error_message.unwrap_or(login.status)
            ))),
        }
    }

    /// Token for the next request, logging in when there is no session
    async fn token(&self) -> Result<String> {
        match &self.credentials {
            Credentials::ApiToken(token) => Ok(token.clone()),
            Credentials::Login { username, password } => {
                let mut session = self.session.lock().await;
                if let Some(token) = session.as_ref() {
                    return Ok(token.clone());
                }
                let token = self.login(username, password).await?;
                *session = Some(token.clone());
                Ok(token)
            }
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &Method,
        endpoint: &str,
        params: &[(&'static str, String)],
        token: &str,
        context: &str,
    ) -> Result<ApiResponse<T>> {
        let url = format!("{}{}", self.api_url, endpoint);
        let mut fields: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.push(("token", token));

        let request = if *method == Method::GET {
            self.client.get(url).query(&fields)
        } else {
            self.client.post(url).form(&fields)
        };

        let response = request
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

        response.json().await.map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("{context}: failed to parse response: {e}"))
        })
    }

    /// Authenticated API call
    ///
    /// A session rejected as `invalid-token` is dropped and the call is
    /// repeated once with a fresh login.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&'static str, String)],
        context: &str,
    ) -> Result<Option<T>> {
        let mut refreshed = false;

        loop {
            let token = self.token().await?;
            let response: ApiResponse<T> =
                self.send(&method, endpoint, params, &token, context).await?;

            match response.status.as_str() {
                STATUS_OK => return Ok(response.response),
                STATUS_INVALID_TOKEN => match &self.credentials {
                    Credentials::ApiToken(_) => {
                        return Err(Error::auth(format!(
                            "{context}: API token is invalid or expired"
                        )));
                    }
                    Credentials::Login { .. } if !refreshed => {
                        tracing::debug!(zone = %self.zone, "Technitium session expired, logging in again");
                        *self.session.lock().await = None;
                        refreshed = true;
                    }
                    Credentials::Login { .. } => {
                        return Err(Error::auth(format!(
                            "{context}: session token rejected after a fresh login"
                        )));
                    }
                },
                status => {
                    let message = response.error_message.unwrap_or_else(|| status.to_string());
                    return Err(Error::provider(
                        PROVIDER_NAME,
                        format!("{context} failed: {message}"),
                    ));
                }
            }
        }
    }

    async fn records(&self, domain: &str, list_zone: bool, context: &str) -> Result<Vec<Record>> {
        let mut params = vec![("zone", self.zone.clone()), ("domain", domain.to_string())];
        if list_zone {
            params.push(("listZone", "true".to_string()));
        }

        let response: Option<RecordsResponse> = self
            .call(Method::GET, "/api/zones/records/get", &params, context)
            .await?;

        Ok(response
            .unwrap_or_default()
            .records
            .into_iter()
            .filter_map(ZoneRecord::into_record)
            .collect())
    }

    fn record_params(&self, record: &Record) -> Vec<(&'static str, String)> {
        vec![
            ("zone", self.zone.clone()),
            ("domain", record.name.clone()),
            ("type", record.record_type.to_string()),
        ]
    }

    async fn post(&self, endpoint: &str, params: &[(&'static str, String)], context: &str) -> Result<()> {
        self.call::<serde_json::Value>(Method::POST, endpoint, params, context)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl DnsProvider for TechnitiumProvider {
    async fn list(&self) -> Result<Vec<Record>> {
        let records = self.records(&self.zone, true, "List records").await?;
        tracing::debug!(zone = %self.zone, count = records.len(), "Listed Technitium records");
        Ok(records)
    }

    async fn get(&self, name: &str, record_type: RecordType) -> Result<Option<Record>> {
        let records = self.records(name, false, "Get record").await?;
        Ok(records
            .into_iter()
            .find(|r| r.name == name && r.record_type == record_type))
    }

    async fn create(&self, record: Record) -> Result<Record> {
        let mut params = self.record_params(&record);
        params.push(("ttl", record.ttl.to_string()));
        params.push(("comments", record.comment.clone()));
        match record.record_type {
            RecordType::A | RecordType::Aaaa => params.push(("ipAddress", record.content.clone())),
            RecordType::Cname => params.push(("cname", record.content.clone())),
        }

        self.post("/api/zones/records/add", &params, "Create record")
            .await?;

        let id = record_id(&record.name, record.record_type, &record.content);
        Ok(record.with_id(id))
    }

    async fn update(&self, record: Record) -> Result<Record> {
        let old_content = match content_from_id(&record.id) {
            Some(content) => content.to_string(),
            None => match self.get(&record.name, record.record_type).await? {
                Some(existing) => existing.content,
                None => return self.create(record).await,
            },
        };

        if record.record_type == RecordType::Cname {
            let old = Record {
                content: old_content,
                ..record.clone()
            };
            self.delete(&old).await?;
            return self.create(record).await;
        }

        let mut params = self.record_params(&record);
        params.push(("ttl", record.ttl.to_string()));
        params.push(("comments", record.comment.clone()));
        params.push(("ipAddress", old_content));
        params.push(("newIpAddress", record.content.clone()));

        self.post("/api/zones/records/update", &params, "Update record")
            .await?;

        let id = record_id(&record.name, record.record_type, &record.content);
        Ok(record.with_id(id))
    }

    async fn delete(&self, record: &Record) -> Result<()> {
        let mut params = self.record_params(record);
        // A CNAME is unique per name; addresses name the value to remove
        if record.record_type != RecordType::Cname {
            params.push(("ipAddress", record.content.clone()));
        }

        self.post("/api/zones/records/delete", &params, "Delete record")
            .await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Technitium providers
///
/// Settings:
///
/// - `api_url` (required): web console base URL
/// - `username` / `password`: user login, used when the zone has no `api_token`
/// - `skip_tls_verify`: `true` to accept any TLS certificate
pub struct TechnitiumFactory;

impl DnsProviderFactory for TechnitiumFactory {
    fn create(&self, zone: &Zone) -> Result<Box<dyn DnsProvider>> {
        let setting = |key: &str| {
            zone.settings
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let api_url = setting("api_url").ok_or_else(|| {
            Error::config(format!(
                "Technitium zone '{}' requires an api_url setting",
                zone.name
            ))
        })?;

        let credentials = match (
            zone.api_token.as_deref().filter(|t| !t.is_empty()),
            setting("username"),
            setting("password"),
        ) {
            (Some(token), _, _) => Credentials::ApiToken(token.to_string()),
            (None, Some(username), Some(password)) => Credentials::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            _ => {
                return Err(Error::config(format!(
                    "Technitium zone '{}' requires an api_token, or username and password settings",
                    zone.name
                )));
            }
        };

        let skip_tls_verify = match setting("skip_tls_verify") {
            None => false,
            Some(value) => value.parse::<bool>().map_err(|_| {
                Error::config(format!(
                    "Technitium zone '{}': skip_tls_verify must be true or false, got '{value}'",
                    zone.name
                ))
            })?,
        };

        Ok(Box::new(TechnitiumProvider::new(
            api_url,
            &zone.name,
            credentials,
            skip_tls_verify,
        )?))
    }
}

/// Register the Technitium provider with a registry
///
/// # Example
///
/// ```rust
/// use dockdns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dockdns_provider_technitium::register(&registry);
/// assert!(registry.has_provider("technitium"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(TechnitiumFactory));
}
