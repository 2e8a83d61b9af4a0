//! Post-notification hooks, keyed by event action.

use crate::core::{Event, EventAction};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A side effect run after an event has been fanned out to the notifiers.
#[async_trait]
pub trait PostHook: Send + Sync {
    async fn run(&self, event: &Event) -> Result<()>;
}

#[async_trait]
impl<F> PostHook for F
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    async fn run(&self, event: &Event) -> Result<()> {
        (self)(event)
    }
}

/// Ordered hooks per action. Immutable once handed to a watcher.
#[derive(Clone, Default)]
pub struct PostHookTable {
    hooks: HashMap<EventAction, Vec<Arc<dyn PostHook>>>,
}

impl PostHookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `hook` to the chain for `action`, builder style.
    pub fn on<H>(mut self, action: impl Into<EventAction>, hook: H) -> Self
    where
        H: PostHook + 'static,
    {
        self.register(action, Arc::new(hook));
        self
    }

    /// Appends a synchronous closure to the chain for `action`.
    pub fn on_fn<F>(self, action: impl Into<EventAction>, hook: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        self.on(action, hook)
    }

    /// Appends an already shared hook to the chain for `action`.
    pub fn register(&mut self, action: impl Into<EventAction>, hook: Arc<dyn PostHook>) {
        self.hooks.entry(action.into()).or_default().push(hook);
    }

    /// The hooks registered for `action`, in registration order.
    pub fn hooks_for(&self, action: &EventAction) -> &[Arc<dyn PostHook>] {
        self.hooks.get(action).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for PostHookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .hooks
            .iter()
            .map(|(action, hooks)| (action.as_str(), hooks.len()))
            .collect();
        f.debug_struct("PostHookTable").field("hooks", &counts).finish()
    }
}
