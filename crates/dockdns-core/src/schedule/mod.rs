//! Debounced multi-trigger scheduler
//!
//! Any number of [`Trigger`]s feed one shared event channel. The
//! [`Scheduler`] collapses bursts of events into a single run of its
//! [`ScheduledTask`] once no new event has arrived for the debounce
//! duration, and never lets a burst postpone a run past the debounce cap.
//!
//! ```text
//! ┌─────────────────┐
//! │ IntervalTrigger │──┐
//! └─────────────────┘  │  TriggerEvent   ┌───────────┐   run()   ┌────────────┐
//!                      ├───────────────▶│ Scheduler │─────────▶│ SyncEngine │
//! ┌─────────────────┐  │  (capacity 1)   └───────────┘           └────────────┘
//! │  DockerTrigger  │──┘                      │ reset()
//! └─────────────────┘◀───────────────────────┘
//! ```
//!
//! ## Timing
//!
//! - event at `t`, no cap pending: fire at `t + debounce`, cap at `t + max_debounce`
//! - event at `t`, cap pending and `t + debounce` beyond it: fire at the cap
//! - fire: clear the cap, reset every trigger, run the task
//!
//! With `run_at_start`, a timer armed at startup runs the task once after
//! `debounce` if no event arrived in the meantime.

pub mod docker;
pub mod interval;

pub use docker::DockerTrigger;
pub use interval::IntervalTrigger;

use crate::shutdown::Shutdown;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A "something changed, re-run" signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Name of the trigger that produced the event
    pub name: String,
}

impl TriggerEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An independent event producer
///
/// # Contract
///
/// - `start` runs until `shutdown` is cancelled and must return promptly
///   afterwards, also while waiting to hand an event to the scheduler.
/// - `reset` must not block. The scheduler calls it after every debounced
///   run, while triggers may be waiting on the event channel.
#[async_trait]
pub trait Trigger: Send + Sync {
    /// Trigger name used in events and logs
    fn name(&self) -> &str;

    /// Produce events until shutdown
    async fn start(&self, shutdown: Shutdown, events: mpsc::Sender<TriggerEvent>);

    /// Restart any internal clock
    fn reset(&self);
}

/// The work the scheduler runs
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    async fn run(&self);
}

/// Debouncing scheduler
pub struct Scheduler {
    task: Arc<dyn ScheduledTask>,
    triggers: Vec<Arc<dyn Trigger>>,
    debounce: Duration,
    max_debounce: Duration,
    run_at_start: bool,
    /// Serializes task runs
    task_lock: Mutex<()>,
}

impl Scheduler {
    /// Create a scheduler with no triggers
    pub fn new(task: Arc<dyn ScheduledTask>, debounce: Duration, max_debounce: Duration) -> Self {
        Self {
            task,
            triggers: Vec::new(),
            debounce,
            max_debounce,
            run_at_start: false,
            task_lock: Mutex::new(()),
        }
    }

    /// Run the task once after startup if no event arrives first
    pub fn with_run_at_start(mut self, run_at_start: bool) -> Self {
        self.run_at_start = run_at_start;
        self
    }

    /// Register a trigger; must happen before [`Scheduler::run`]
    pub fn register(&mut self, trigger: Arc<dyn Trigger>) {
        self.triggers.push(trigger);
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Run the task immediately, waiting for any run in progress to finish
    pub async fn run_now(&self) {
        let _guard = self.task_lock.lock().await;
        debug!("Executing scheduled task");
        self.task.run().await;
    }

    /// Start every trigger and schedule task runs until shutdown.
    ///
    /// Returns after all trigger tasks have exited.
    pub async fn run(&self, mut shutdown: Shutdown) {
        let (tx, mut rx) = mpsc::channel::<TriggerEvent>(1);

        let mut triggers = JoinSet::new();
        for trigger in &self.triggers {
            let trigger = Arc::clone(trigger);
            let shutdown = shutdown.clone();
            let tx = tx.clone();
            triggers.spawn(async move {
                trigger.start(shutdown, tx).await;
                debug!(trigger = %trigger.name(), "Trigger stopped");
            });
        }
        drop(tx);

        info!(
            triggers = self.triggers.len(),
            debounce_secs = self.debounce.as_secs_f64(),
            max_debounce_secs = self.max_debounce.as_secs_f64(),
            run_at_start = self.run_at_start,
            "Scheduler started"
        );

        let timer = tokio::time::sleep(self.debounce);
        tokio::pin!(timer);
        // A fired Sleep stays ready; only poll it while a deadline is pending
        let mut armed = true;
        let mut initial_run_done = !self.run_at_start;
        let mut cap: Option<Instant> = None;
        let mut last_event: Option<TriggerEvent> = None;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Scheduler received stop signal");
                    break;
                }

                Some(event) = rx.recv() => {
                    let now = Instant::now();
                    let next = now + self.debounce;

                    match cap {
                        Some(deadline) if next > deadline => {
                            debug!(
                                trigger = %event.name,
                                "Received event, resetting would exceed maximum debounce time"
                            );
                            timer.as_mut().reset(deadline);
                        }
                        _ => {
                            debug!(trigger = %event.name, "Received event, resetting debounce timer");
                            timer.as_mut().reset(next);
                            if cap.is_none() {
                                cap = Some(now + self.max_debounce);
                            }
                        }
                    }

                    armed = true;
                    last_event = Some(event);
                }

                _ = &mut timer, if armed => {
                    armed = false;

                    match &last_event {
                        None => {
                            if !initial_run_done {
                                info!("Performing initial sync after startup");
                                initial_run_done = true;
                                self.run_now().await;
                            }
                        }
                        Some(event) => {
                            debug!(trigger = %event.name, "Debounce elapsed");
                            cap = None;
                            for trigger in &self.triggers {
                                trigger.reset();
                            }
                            self.run_now().await;
                        }
                    }
                }
            }
        }

        drop(rx);
        while let Some(result) = triggers.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Trigger task ended abnormally");
            }
        }

        info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    #[async_trait]
    impl ScheduledTask for Counter {
        async fn run(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_trigger_event_name() {
        let event = TriggerEvent::new("IntervalTrigger");
        assert_eq!(event.name, "IntervalTrigger");
        assert_eq!(event.clone(), event);
    }

    #[tokio::test]
    async fn test_run_now_runs_task() {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let scheduler = Scheduler::new(
            counter.clone(),
            Duration::from_secs(10),
            Duration::from_secs(60),
        );

        scheduler.run_now().await;
        scheduler.run_now().await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.trigger_count(), 0);
    }
}
