//! Failures of a reconciliation pass and its collaborators
//!
//! The engine never aborts a pass on these: a failed provider call is logged
//! against its `(domain, record type)` pair and the next pass tries again.
//! Variants are split by the failing collaborator and, for HTTP backends,
//! by status class so callers can tell an expired token from a throttled
//! request.

use thiserror::Error;

/// Result of any fallible agent operation
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while syncing records
#[derive(Error, Debug)]
pub enum Error {
    /// The public IPv4/IPv6 address could not be determined
    #[error("IP lookup error: {0}")]
    IpLookup(String),

    /// Container listing or the event subscription failed
    #[error("Docker error: {0}")]
    Docker(String),

    /// Invalid or incomplete configuration, including zone settings
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failure before a backend answered
    #[error("HTTP error: {0}")]
    Http(String),

    /// Rejected credentials: API token, session login or TSIG key
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The backend asked us to slow down
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The zone does not exist at the backend
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record the backend cannot express (bad address, missing ID)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any other backend failure, tagged with the backend name
    #[error("Provider error ({provider}): {message}")]
    Provider {
        provider: String,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn ip_lookup(msg: impl Into<String>) -> Self {
        Self::IpLookup(msg.into())
    }

    pub fn docker(msg: impl Into<String>) -> Self {
        Self::Docker(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Backend failure; `provider` is the name the backend registers under
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

// Daemon-side context chains end up here as plain text
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
