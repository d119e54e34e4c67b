//! Fixed-interval trigger

use super::{Trigger, TriggerEvent};
use crate::shutdown::Shutdown;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tracing::debug;

const NAME: &str = "IntervalTrigger";

/// Emits an event every `interval`; [`Trigger::reset`] restarts the clock
pub struct IntervalTrigger {
    interval: Duration,
    reset: Notify,
}

impl IntervalTrigger {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            reset: Notify::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self, mut shutdown: Shutdown, events: mpsc::Sender<TriggerEvent>) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("IntervalTrigger received stop signal");
                    return;
                }
                _ = self.reset.notified() => {
                    debug!("Resetting interval timer");
                    continue;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            tokio::select! {
                _ = shutdown.cancelled() => return,
                sent = events.send(TriggerEvent::new(NAME)) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Never blocks; a reset requested while an event is being handed over
    /// applies to the next interval.
    fn reset(&self) {
        self.reset.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownHandle;
    use std::sync::Arc;

    fn assert_secs(elapsed: Duration, secs: u64) {
        assert!(
            elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs + 1),
            "expected ~{secs}s, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_every_interval() {
        let trigger = Arc::new(IntervalTrigger::new(Duration::from_secs(60)));
        let handle = ShutdownHandle::new();
        let (tx, mut rx) = mpsc::channel(1);

        let task = {
            let trigger = Arc::clone(&trigger);
            let shutdown = handle.listener();
            tokio::spawn(async move { trigger.start(shutdown, tx).await })
        };

        let start = tokio::time::Instant::now();
        let first = rx.recv().await.expect("first event");
        assert_eq!(first.name, "IntervalTrigger");
        assert_secs(start.elapsed(), 60);

        rx.recv().await.expect("second event");
        assert_secs(start.elapsed(), 120);

        handle.trigger();
        task.await.expect("trigger task joins");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restarts_clock() {
        let trigger = Arc::new(IntervalTrigger::new(Duration::from_secs(60)));
        let handle = ShutdownHandle::new();
        let (tx, mut rx) = mpsc::channel(1);

        let task = {
            let trigger = Arc::clone(&trigger);
            let shutdown = handle.listener();
            tokio::spawn(async move { trigger.start(shutdown, tx).await })
        };

        let start = tokio::time::Instant::now();
        tokio::time::sleep(Duration::from_secs(40)).await;
        trigger.reset();

        rx.recv().await.expect("event after reset");
        assert_secs(start.elapsed(), 100);

        handle.trigger();
        task.await.expect("trigger task joins");
    }

    #[tokio::test]
    async fn test_reset_does_not_block_without_listener() {
        let trigger = IntervalTrigger::new(Duration::from_secs(60));
        trigger.reset();
        trigger.reset();
        assert_eq!(trigger.interval(), Duration::from_secs(60));
    }
}
