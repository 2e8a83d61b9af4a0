//! Per-event processing: fan-out to every notifier, then the post-hooks
//! registered for the event's action.

use crate::core::{Event, EventAction};
use crate::hooks::PostHookTable;
use crate::notification::registry::NotifierRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// How failures from several notifiers (or hooks) collapse into one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// The result of the last notifier or hook invoked is returned; earlier
    /// failures are dropped, including when a later call succeeds.
    #[default]
    LastWins,
    /// Every failure is returned.
    Collect,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::LastWins => write!(f, "last_wins"),
            ErrorPolicy::Collect => write!(f, "collect"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("notifier '{backend}' failed: {source:#}")]
    Notify {
        backend: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("post-hook #{index} for '{action}' failed: {source:#}")]
    Hook {
        action: EventAction,
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("{} failures: [{}]", .0.len(), join_errors(.0))]
    Multiple(Vec<DispatchError>),
}

impl DispatchError {
    /// The backend behind a notify failure.
    pub fn backend(&self) -> Option<&str> {
        match self {
            DispatchError::Notify { backend, .. } => Some(backend),
            _ => None,
        }
    }
}

fn join_errors(errors: &[DispatchError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Folds individual results according to an `ErrorPolicy`.
struct Outcome {
    policy: ErrorPolicy,
    last: Result<(), DispatchError>,
    collected: Vec<DispatchError>,
}

impl Outcome {
    fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            last: Ok(()),
            collected: Vec::new(),
        }
    }

    fn record(&mut self, result: Result<(), DispatchError>) {
        match self.policy {
            ErrorPolicy::LastWins => {
                if let Err(superseded) = std::mem::replace(&mut self.last, result) {
                    debug!(error = %superseded, "Earlier failure superseded by a later result");
                }
            }
            ErrorPolicy::Collect => {
                if let Err(e) = result {
                    self.collected.push(e);
                }
            }
        }
    }

    fn finish(self) -> Result<(), DispatchError> {
        match self.policy {
            ErrorPolicy::LastWins => self.last,
            ErrorPolicy::Collect => {
                let mut collected = self.collected;
                match collected.len() {
                    0 => Ok(()),
                    1 => Err(collected.remove(0)),
                    _ => Err(DispatchError::Multiple(collected)),
                }
            }
        }
    }
}

/// Runs the notify fan-out and post-hook chain for one event at a time.
pub struct Dispatcher {
    registry: Arc<NotifierRegistry>,
    hooks: PostHookTable,
    policy: ErrorPolicy,
}

impl Dispatcher {
    pub fn new(registry: Arc<NotifierRegistry>, hooks: PostHookTable, policy: ErrorPolicy) -> Self {
        Self {
            registry,
            hooks,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<NotifierRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Notifies every backend, then runs the post-hooks unless notification failed.
    pub async fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        self.notify_all(event).await?;
        self.run_post_hooks(event).await
    }

    /// Calls every notifier in name order without short-circuiting.
    pub async fn notify_all(&self, event: &Event) -> Result<(), DispatchError> {
        let mut outcome = Outcome::new(self.policy);
        for (name, notifier) in self.registry.notifiers() {
            let result = notifier
                .notify(&event.event_action, &event.event_data)
                .await
                .map_err(|source| {
                    warn!(backend = name, action = %event.event_action, error = %source, "Notifier failed");
                    metrics::counter!("notify_failures_total", "backend" => name.to_string())
                        .increment(1);
                    DispatchError::Notify {
                        backend: name.to_string(),
                        source,
                    }
                });
            outcome.record(result);
        }
        outcome.finish()
    }

    /// Runs the hooks registered for the event's action, in order, without
    /// short-circuiting.
    pub async fn run_post_hooks(&self, event: &Event) -> Result<(), DispatchError> {
        let mut outcome = Outcome::new(self.policy);
        for (index, hook) in self.hooks.hooks_for(&event.event_action).iter().enumerate() {
            let result = hook.run(event).await.map_err(|source| {
                metrics::counter!("hook_failures_total", "action" => event.event_action.to_string())
                    .increment(1);
                DispatchError::Hook {
                    action: event.event_action.clone(),
                    index,
                    source,
                }
            });
            outcome.record(result);
        }
        outcome.finish()
    }
}
