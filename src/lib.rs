/// eventwatch - in-process dispatcher for platform lifecycle events
///
/// This library fans lifecycle events (VM boot, container start, billing
/// changes, ...) out to the configured notification backends and then runs
/// the post-notification hooks registered for each event action.
pub mod notification;

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod dispatch;
pub mod events;
pub mod formatting;
pub mod hooks;
pub mod watcher;

// Re-export core types for convenience
pub use crate::core::*;
pub use config::{BackendConfig, EventsConfigMap};
pub use dispatch::{DispatchError, Dispatcher, ErrorPolicy};
pub use hooks::{PostHook, PostHookTable};
pub use notification::registry::{is_enabled, NotifierRegistry};
pub use watcher::{WatchError, Watcher, WatcherState};
