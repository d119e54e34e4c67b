//! Container lifecycle event trigger

use super::{Trigger, TriggerEvent};
use crate::shutdown::Shutdown;
use crate::traits::ContainerEventSource;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

const NAME: &str = "DockerEventTrigger";

/// Delay before resubscribing after the event stream closed
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Emits one event per qualifying container event and resubscribes
/// whenever the stream closes
pub struct DockerTrigger {
    source: Arc<dyn ContainerEventSource>,
    reconnect_delay: Duration,
}

impl DockerTrigger {
    pub fn new(source: Arc<dyn ContainerEventSource>) -> Self {
        Self {
            source,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Forward events from one subscription.
    ///
    /// Returns `false` once shutdown was requested or the scheduler is gone.
    async fn forward(&self, shutdown: &mut Shutdown, events: &mpsc::Sender<TriggerEvent>) -> bool {
        let mut stream = match self.source.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Failed to subscribe to container events");
                return true;
            }
        };
        info!("Listening for container events");

        loop {
            let item = tokio::select! {
                _ = shutdown.cancelled() => return false,
                item = stream.next() => item,
            };

            match item {
                Some(Ok(event)) => {
                    debug!(action = %event.action, container = %event.container_id, "Container event");
                    tokio::select! {
                        _ = shutdown.cancelled() => return false,
                        sent = events.send(TriggerEvent::new(NAME)) => {
                            if sent.is_err() {
                                return false;
                            }
                        }
                    }
                }
                Some(Err(e)) => warn!(error = %e, "Error listening to container events"),
                None => return true,
            }
        }
    }
}

#[async_trait]
impl Trigger for DockerTrigger {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self, mut shutdown: Shutdown, events: mpsc::Sender<TriggerEvent>) {
        loop {
            if !self.forward(&mut shutdown, &events).await {
                debug!("DockerEventTrigger received stop signal");
                return;
            }

            warn!(
                delay_secs = self.reconnect_delay.as_secs_f64(),
                "Container event stream closed, reconnecting"
            );
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// No internal clock to restart
    fn reset(&self) {}
}
