//! Core domain types and service traits for eventwatch
//!
//! This module defines the event record handed to the dispatcher and the
//! trait contract every notification backend implements.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Payload carried by an event: account id, assembly id, IPs, cost and so on.
pub type EventData = HashMap<String, String>;

/// Identifier naming the kind of occurrence, e.g. `containerrunning`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EventAction(String);

impl EventAction {
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventAction {
    fn from(action: &str) -> Self {
        Self(action.to_string())
    }
}

impl From<String> for EventAction {
    fn from(action: String) -> Self {
        Self(action)
    }
}

/// A lifecycle event describing a resource state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Event {
    /// What happened
    pub event_action: EventAction,
    /// Free-form payload
    #[serde(default)]
    pub event_data: EventData,
}

impl Event {
    /// Creates an event with an empty payload.
    pub fn new(action: impl Into<EventAction>) -> Self {
        Self {
            event_action: action.into(),
            event_data: EventData::new(),
        }
    }

    /// Adds a payload entry, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.event_data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// A notification backend bound to its configuration.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A unique, descriptive name for the backend (e.g., "slack").
    /// Used for logging and metrics.
    fn name(&self) -> &str;

    /// Delivers one event to the backend.
    ///
    /// # Returns
    /// * `Ok(())` if the event was delivered or the backend chose to skip it
    /// * `Err` on delivery failure or when the backend is misconfigured
    async fn notify(&self, action: &EventAction, data: &EventData) -> Result<()>;
}
