//! The event watcher: a single worker task that consumes the inbound queue and
//! dispatches each event in order.
//!
//! Lifecycle is `Idle -> Running -> Stopped`. A watcher runs at most one worker
//! and cannot be restarted once stopped; build a new one to watch again.

use crate::config::EventsConfigMap;
use crate::core::Event;
use crate::dispatch::{Dispatcher, ErrorPolicy};
use crate::events::{EventReceiver, StopMark};
use crate::hooks::PostHookTable;
use crate::notification::registry::{self, NotifierRegistry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchError {
    #[error("watcher is already running")]
    AlreadyRunning,

    #[error("watcher was stopped and cannot be restarted")]
    Stopped,

    #[error("no tokio runtime available to run the watcher")]
    NoRuntime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Stopped,
}

enum Lifecycle {
    Idle {
        hooks: PostHookTable,
    },
    Running {
        // Carries the stop cutoff; dropping it cancels the worker outright.
        cancel_tx: watch::Sender<Option<u64>>,
        stop_mark: StopMark,
        worker: Option<JoinHandle<()>>,
    },
    Stopped {
        worker: Option<JoinHandle<()>>,
    },
}

/// Dispatches events from one inbound queue to the notifiers and post-hooks.
pub struct Watcher {
    registry: Arc<NotifierRegistry>,
    policy: ErrorPolicy,
    lifecycle: Mutex<Lifecycle>,
}

impl Watcher {
    /// Builds the notifier registry from `config`, installs it process-wide and
    /// binds the watcher to it.
    pub fn new(config: &EventsConfigMap, hooks: PostHookTable) -> Self {
        Self::with_registry(registry::register(config), hooks)
    }

    /// Binds the watcher to an explicit registry without touching global state.
    pub fn with_registry(registry: Arc<NotifierRegistry>, hooks: PostHookTable) -> Self {
        Self {
            registry,
            policy: ErrorPolicy::default(),
            lifecycle: Mutex::new(Lifecycle::Idle { hooks }),
        }
    }

    /// Sets how multiple notifier or hook failures are reported.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<NotifierRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn state(&self) -> WatcherState {
        match &*self.lock() {
            Lifecycle::Idle { .. } => WatcherState::Idle,
            Lifecycle::Running { .. } => WatcherState::Running,
            Lifecycle::Stopped { .. } => WatcherState::Stopped,
        }
    }

    /// Spawns the worker on the current tokio runtime and returns immediately.
    pub fn start_watching(&self, events: EventReceiver) -> Result<(), WatchError> {
        let mut lifecycle = self.lock();
        let (runtime, hooks) = match &mut *lifecycle {
            Lifecycle::Running { .. } => return Err(WatchError::AlreadyRunning),
            Lifecycle::Stopped { .. } => return Err(WatchError::Stopped),
            Lifecycle::Idle { hooks } => {
                let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
                (runtime, std::mem::take(hooks))
            }
        };

        let (cancel_tx, cancel_rx) = watch::channel(None);
        let stop_mark = events.stop_mark();
        let dispatcher = Dispatcher::new(self.registry.clone(), hooks, self.policy);
        let worker = runtime.spawn(run_worker(dispatcher, events, cancel_rx));

        *lifecycle = Lifecycle::Running {
            cancel_tx,
            stop_mark,
            worker: Some(worker),
        };
        info!(policy = %self.policy, "Watcher started");
        Ok(())
    }

    /// Requests shutdown. Events enqueued before this call are still processed;
    /// later ones are not. Calling it again, or before starting, does nothing.
    pub fn stop(&self) {
        let mut lifecycle = self.lock();
        let next = match &mut *lifecycle {
            Lifecycle::Idle { .. } => {
                debug!("Stop requested on a watcher that was never started");
                return;
            }
            Lifecycle::Stopped { .. } => {
                debug!("Watcher already stopped");
                return;
            }
            Lifecycle::Running {
                cancel_tx,
                stop_mark,
                worker,
            } => {
                let cutoff = stop_mark.mark();
                cancel_tx.send_replace(Some(cutoff));
                info!(cutoff, "Stopping watcher");
                Lifecycle::Stopped {
                    worker: worker.take(),
                }
            }
        };
        *lifecycle = next;
    }

    /// Waits for the worker to exit, either after `stop` or once every event
    /// sender has been dropped.
    pub async fn wait(&self) {
        let worker = match &mut *self.lock() {
            Lifecycle::Idle { .. } => None,
            Lifecycle::Running { worker, .. } | Lifecycle::Stopped { worker } => worker.take(),
        };
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Watcher worker panicked");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_worker(
    dispatcher: Dispatcher,
    mut events: EventReceiver,
    mut cancel_rx: watch::Receiver<Option<u64>>,
) {
    info!("Watcher worker running");
    // Events enqueued before stop that have been taken off the queue.
    let mut consumed: u64 = 0;

    loop {
        tokio::select! {
            biased;
            changed = cancel_rx.changed() => {
                let cutoff = *cancel_rx.borrow_and_update();
                match (cutoff, changed) {
                    (Some(cutoff), _) => {
                        consumed = drain(&dispatcher, &mut events, consumed, cutoff).await;
                        info!(consumed, "Watcher worker exiting");
                        break;
                    }
                    (None, Err(_)) => {
                        info!(consumed, "Watcher dropped, worker exiting");
                        break;
                    }
                    (None, Ok(())) => {}
                }
            }
            queued = events.recv_queued() => match queued {
                Some(queued) if queued.after_stop() => {
                    debug!(action = %queued.event.event_action, "Discarding event enqueued after stop");
                }
                Some(queued) => {
                    process(&dispatcher, &queued.event).await;
                    consumed += 1;
                }
                None => {
                    info!(consumed, "Event source closed, watcher worker exiting");
                    break;
                }
            }
        }
    }
}

/// Processes the events enqueued before stop that are still queued, skipping
/// anything stamped after it. Exactly `cutoff` events were stamped before the
/// stop mark, and a stamped event is pushed without awaiting queue capacity,
/// so this only waits for pushes already under way.
async fn drain(
    dispatcher: &Dispatcher,
    events: &mut EventReceiver,
    mut consumed: u64,
    cutoff: u64,
) -> u64 {
    while consumed < cutoff {
        match events.recv_queued().await {
            Some(queued) if queued.after_stop() => {
                debug!(action = %queued.event.event_action, "Discarding event enqueued after stop");
            }
            Some(queued) => {
                process(dispatcher, &queued.event).await;
                consumed += 1;
            }
            None => break,
        }
    }
    consumed
}

async fn process(dispatcher: &Dispatcher, event: &Event) {
    debug!(action = %event.event_action, "Processing event");
    metrics::counter!("events_processed_total").increment(1);
    if let Err(e) = dispatcher.dispatch(event).await {
        warn!(action = %event.event_action, error = %e, "Failed to process watch event");
    }
}
