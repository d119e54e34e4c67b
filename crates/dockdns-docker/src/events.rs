//! Container lifecycle events
//!
//! The Engine API filters by type, label and action server side;
//! [`event_from_message`] applies the type and action checks again.

use bollard::models::{EventMessage, EventMessageTypeEnum};
use dockdns_core::Error;
use dockdns_core::traits::{ContainerEvent, ContainerEventStream};
use futures::{Stream, StreamExt};
use std::fmt::Display;

/// Container actions that can change the set of published names
pub const WATCHED_ACTIONS: [&str; 3] = ["start", "stop", "die"];

/// Convert one message; `None` for events the agent does not watch
pub fn event_from_message(message: EventMessage) -> Option<ContainerEvent> {
    if message.typ != Some(EventMessageTypeEnum::CONTAINER) {
        return None;
    }

    let action = message.action?;
    if !WATCHED_ACTIONS.contains(&action.as_str()) {
        return None;
    }

    Some(ContainerEvent {
        action,
        container_id: message.actor.and_then(|actor| actor.id).unwrap_or_default(),
    })
}

/// Turn a decoded event stream into container events
///
/// The stream ends when the source ends or after the first error.
pub fn container_events<S, E>(messages: S) -> ContainerEventStream
where
    S: Stream<Item = Result<EventMessage, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = (Box::pin(messages), false);

    let events = futures::stream::unfold(state, |(mut messages, failed)| async move {
        if failed {
            return None;
        }
        loop {
            match messages.next().await? {
                Ok(message) => {
                    if let Some(event) = event_from_message(message) {
                        return Some((Ok(event), (messages, false)));
                    }
                }
                Err(e) => {
                    let error = Error::docker(format!("Event stream failed: {e}"));
                    return Some((Err(error), (messages, true)));
                }
            }
        }
    });

    Box::pin(events)
}
