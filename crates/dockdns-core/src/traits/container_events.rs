// # Container Event Source Trait
//
// A subscription to container lifecycle events, already filtered to the
// containers and actions that matter for DNS (opt-in label; start, stop, die).
//
// ## Implementations
//
// - Docker Engine API: `dockdns-docker` crate

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// A container lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEvent {
    /// Lifecycle action (e.g. "start", "die")
    pub action: String,
    /// Container ID
    pub container_id: String,
}

/// Stream of container events; an `Err` item is a transient stream error
pub type ContainerEventStream =
    Pin<Box<dyn Stream<Item = Result<ContainerEvent, crate::Error>> + Send + 'static>>;

/// Trait for container event subscriptions
///
/// # Behavior
///
/// - The returned stream ends when the backend disconnects; the caller
///   resubscribes.
/// - Dropping the stream must release the subscription.
#[async_trait]
pub trait ContainerEventSource: Send + Sync {
    /// Open a new subscription
    async fn subscribe(&self) -> Result<ContainerEventStream, crate::Error>;
}
