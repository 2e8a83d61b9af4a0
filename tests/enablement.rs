//! Process-wide registration and the enablement query.

use eventwatch::{
    config::EventsConfigMap,
    hooks::PostHookTable,
    is_enabled,
    notification::registry::{self, NotifierRegistry},
    Watcher,
};
use serial_test::serial;
use std::sync::Arc;

#[test]
#[serial]
fn test_enablement_follows_registration_config() {
    let config = EventsConfigMap::new()
        .with("mail", "enabled", "true")
        .with("chat", "enabled", "false");
    let _watcher = Watcher::new(&config, PostHookTable::new());

    assert!(is_enabled("mail"));
    assert!(!is_enabled("chat"));
    assert!(!is_enabled("sms"));
}

#[test]
#[serial]
fn test_known_backends_start_disabled() {
    let _watcher = Watcher::new(&EventsConfigMap::new(), PostHookTable::new());

    for backend in ["mailgun", "infobip", "slack", "bill"] {
        assert!(!is_enabled(backend), "{} should be disabled", backend);
    }
}

#[test]
#[serial]
fn test_registration_replaces_previous_state() {
    registry::register(&EventsConfigMap::new().with("slack", "enabled", "true"));
    assert!(is_enabled("slack"));

    registry::register(&EventsConfigMap::new().with("mailgun", "enabled", "true"));
    assert!(!is_enabled("slack"));
    assert!(is_enabled("mailgun"));
    assert_eq!(registry::current().len(), 5);
}

#[test]
#[serial]
fn test_owned_registry_leaves_global_state_alone() {
    registry::install(Arc::new(NotifierRegistry::empty()));

    let owned = Arc::new(NotifierRegistry::from_config(
        &EventsConfigMap::new().with("infobip", "enabled", "true"),
    ));
    let watcher = Watcher::with_registry(owned, PostHookTable::new());

    assert!(watcher.registry().is_enabled("infobip"));
    assert!(!is_enabled("infobip"));
}
