// # Docker Integration
//
// Docker Engine API client for the DockDNS agent.
//
// - [`DockerClient`] as a `DomainSource`: lists running containers carrying
//   the `dockdns.name` label and maps their labels to domain records
// - [`DockerClient`] as a `ContainerEventSource`: subscribes to start, stop
//   and die events of those containers
//
// ## Endpoint
//
// `docker.endpoint` from the configuration, else `DOCKER_HOST`, else the
// local socket `unix:///var/run/docker.sock`. Accepted forms:
//
// - `unix:///path/to/docker.sock` or a bare absolute path
// - `tcp://host:port` (plain HTTP), `http://host:port`, or `host:port`
//
// TLS endpoints are not supported; put a socket proxy on the Docker host.

pub mod events;
pub mod labels;

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::system::EventsOptions;
use bollard::{API_DEFAULT_VERSION, Docker};
use dockdns_core::config::DockerConfig;
use dockdns_core::traits::{ContainerEventSource, ContainerEventStream, DomainSource};
use dockdns_core::{DomainRecord, Error, Result};
use std::collections::HashMap;

pub use labels::NAME_LABEL;

/// Socket used when neither the configuration nor `DOCKER_HOST` names an endpoint
pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// Request timeout in seconds; covers the response head only, so the event
/// stream stays open past it
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Where the Engine API listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Path of a Unix domain socket
    Unix(String),
    /// Plain HTTP base URL without a trailing slash
    Http(String),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{path}"),
            Endpoint::Http(url) => f.write_str(url),
        }
    }
}

/// Container as listed by the Engine API, reduced to what label mapping needs
#[derive(Debug, Clone, Default)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub labels: HashMap<String, String>,
}

impl From<bollard::models::ContainerSummary> for ContainerSummary {
    fn from(container: bollard::models::ContainerSummary) -> Self {
        Self {
            id: container.id.unwrap_or_default(),
            names: container.names.unwrap_or_default(),
            labels: container.labels.unwrap_or_default(),
        }
    }
}

/// Pick the Engine API endpoint
///
/// `configured` wins over `docker_host`; both empty means [`DEFAULT_SOCKET`].
pub fn resolve_endpoint(configured: Option<&str>, docker_host: Option<&str>) -> Result<Endpoint> {
    let raw = configured
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(docker_host.map(str::trim).filter(|s| !s.is_empty()));

    let Some(raw) = raw else {
        return Ok(Endpoint::Unix(DEFAULT_SOCKET.to_string()));
    };

    if let Some(path) = raw.strip_prefix("unix://") {
        if path.is_empty() {
            return Err(Error::docker(format!("Docker endpoint {raw} has no socket path")));
        }
        return Ok(Endpoint::Unix(path.to_string()));
    }
    if raw.starts_with('/') {
        return Ok(Endpoint::Unix(raw.to_string()));
    }
    if raw.starts_with("https://") || raw.starts_with("npipe://") || raw.starts_with("ssh://") {
        return Err(Error::docker(format!(
            "Unsupported Docker endpoint {raw}: use a unix socket or plain HTTP"
        )));
    }

    let url = if let Some(rest) = raw.strip_prefix("tcp://") {
        format!("http://{rest}")
    } else if raw.starts_with("http://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    Ok(Endpoint::Http(url.trim_end_matches('/').to_string()))
}

#[cfg(unix)]
fn connect_unix(path: &str) -> Result<Docker> {
    Docker::connect_with_unix(path, REQUEST_TIMEOUT_SECS, API_DEFAULT_VERSION)
        .map_err(|e| Error::docker(format!("Failed to set up Docker client for unix://{path}: {e}")))
}

#[cfg(not(unix))]
fn connect_unix(path: &str) -> Result<Docker> {
    Err(Error::docker(format!(
        "Unix sockets are not available on this platform: unix://{path}"
    )))
}

/// Docker Engine API client
#[derive(Debug, Clone)]
pub struct DockerClient {
    endpoint: Endpoint,
    docker: Docker,
}

impl DockerClient {
    /// Create a client for an endpoint (see [`resolve_endpoint`] for accepted forms)
    ///
    /// No connection is made until the first request.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::connect(resolve_endpoint(Some(endpoint), None)?)
    }

    /// Create a client from configuration, falling back to `DOCKER_HOST`
    pub fn from_config(config: &DockerConfig) -> Result<Self> {
        let docker_host = std::env::var("DOCKER_HOST").ok();
        let endpoint = resolve_endpoint(config.endpoint.as_deref(), docker_host.as_deref())?;
        tracing::debug!(endpoint = %endpoint, "Using Docker endpoint");
        Self::connect(endpoint)
    }

    fn connect(endpoint: Endpoint) -> Result<Self> {
        let docker = match &endpoint {
            Endpoint::Unix(path) => connect_unix(path)?,
            Endpoint::Http(url) => {
                Docker::connect_with_http(url, REQUEST_TIMEOUT_SECS, API_DEFAULT_VERSION)
                    .map_err(|e| {
                        Error::docker(format!("Failed to set up Docker client for {url}: {e}"))
                    })?
            }
        };

        Ok(Self { endpoint, docker })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Running containers that carry the name label
    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptions {
            filters: HashMap::from([("label".to_string(), vec![NAME_LABEL.to_string()])]),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| Error::docker(format!("Failed to list containers: {e}")))?;

        Ok(containers.into_iter().map(ContainerSummary::from).collect())
    }
}

#[async_trait]
impl DomainSource for DockerClient {
    async fn domains(&self) -> Result<Vec<DomainRecord>> {
        let containers = self.list_containers().await?;
        let domains = labels::domains_from_containers(&containers);
        tracing::debug!(
            containers = containers.len(),
            domains = domains.len(),
            "Read domains from container labels"
        );
        Ok(domains)
    }
}

#[async_trait]
impl ContainerEventSource for DockerClient {
    /// Connection and HTTP errors arrive as the first stream item
    async fn subscribe(&self) -> Result<ContainerEventStream> {
        let options = EventsOptions {
            filters: HashMap::from([
                ("type".to_string(), vec!["container".to_string()]),
                ("label".to_string(), vec![NAME_LABEL.to_string()]),
                (
                    "event".to_string(),
                    events::WATCHED_ACTIONS.iter().map(|a| a.to_string()).collect(),
                ),
            ]),
            ..Default::default()
        };

        Ok(events::container_events(self.docker.events(Some(options))))
    }
}
