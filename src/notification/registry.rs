//! Builds the set of active notifiers from configuration and tracks which
//! backends are enabled.
//!
//! A `NotifierRegistry` is immutable once built and is shared with watchers as
//! an `Arc`. A process-wide slot is also kept for callers that register once at
//! startup and query enablement from anywhere; replacing it is atomic for
//! readers.

use crate::config::EventsConfigMap;
use crate::constants::{AUDIT, GATEWAY, INFOBIP, KNOWN_ENABLEMENT, MAILGUN, META, SLACK};
use crate::core::Notifier;
use crate::notification::{
    audit::AuditSink, gateway::GatewayNotifier, infobip::InfobipNotifier,
    mailgun::MailgunNotifier, slack::SlackNotifier,
};
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The active notifiers, keyed and ordered by backend name, plus enablement flags.
pub struct NotifierRegistry {
    notifiers: BTreeMap<String, Arc<dyn Notifier>>,
    enabled: HashMap<String, bool>,
}

impl NotifierRegistry {
    /// A registry with no notifiers and every known backend disabled.
    pub fn empty() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Constructs one notifier per known backend kind.
    ///
    /// Never fails: a backend with missing or invalid settings still gets a
    /// notifier, which reports the problem when it is asked to notify.
    pub fn from_config(config: &EventsConfigMap) -> Self {
        let meta = config.get(META);
        let mut builder = Self::builder()
            .notifier(Arc::new(MailgunNotifier::new(config.get(MAILGUN), meta.clone())))
            .notifier(Arc::new(SlackNotifier::new(config.get(SLACK))))
            .notifier(Arc::new(InfobipNotifier::new(config.get(INFOBIP))))
            .notifier(Arc::new(AuditSink::new(meta.clone())))
            .notifier(Arc::new(GatewayNotifier::new(meta)));

        for (backend, settings) in config.iter() {
            if settings.is_enabled() {
                builder = builder.enabled(backend, true);
            }
        }

        let registry = builder.build();
        info!(
            notifiers = ?registry.names().collect::<Vec<_>>(),
            enabled = ?registry.enabled_backends(),
            "Notifier registry built"
        );
        registry
    }

    /// Whether `backend` was explicitly enabled. Unknown names are disabled.
    pub fn is_enabled(&self, backend: &str) -> bool {
        self.enabled.get(backend).copied().unwrap_or(false)
    }

    /// Names of every enabled backend, sorted.
    pub fn enabled_backends(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .enabled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Notifiers in name order.
    pub fn notifiers(&self) -> impl Iterator<Item = (&str, &Arc<dyn Notifier>)> {
        self.notifiers.iter().map(|(name, n)| (name.as_str(), n))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.notifiers.keys().map(String::as_str)
    }

    pub fn get(&self, backend: &str) -> Option<&Arc<dyn Notifier>> {
        self.notifiers.get(backend)
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("notifiers", &self.names().collect::<Vec<_>>())
            .field("enabled", &self.enabled_backends())
            .finish()
    }
}

/// Composes a registry from arbitrary notifiers.
pub struct RegistryBuilder {
    notifiers: BTreeMap<String, Arc<dyn Notifier>>,
    enabled: HashMap<String, bool>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            notifiers: BTreeMap::new(),
            enabled: KNOWN_ENABLEMENT
                .iter()
                .map(|name| (name.to_string(), false))
                .collect(),
        }
    }
}

impl RegistryBuilder {
    /// Adds a notifier under its own name, replacing any with the same name.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.insert(notifier.name().to_string(), notifier);
        self
    }

    pub fn enabled(mut self, backend: &str, enabled: bool) -> Self {
        self.enabled.insert(backend.to_string(), enabled);
        self
    }

    pub fn build(self) -> NotifierRegistry {
        NotifierRegistry {
            notifiers: self.notifiers,
            enabled: self.enabled,
        }
    }
}

static GLOBAL: Lazy<ArcSwap<NotifierRegistry>> =
    Lazy::new(|| ArcSwap::from_pointee(NotifierRegistry::empty()));

/// Builds a registry from `config` and installs it process-wide, replacing the
/// previous one. Returns the new registry.
pub fn register(config: &EventsConfigMap) -> Arc<NotifierRegistry> {
    let registry = Arc::new(NotifierRegistry::from_config(config));
    install(registry.clone());
    registry
}

/// Installs `registry` as the process-wide registry.
pub fn install(registry: Arc<NotifierRegistry>) {
    GLOBAL.store(registry);
}

/// The process-wide registry; empty until `register` or `install` is called.
pub fn current() -> Arc<NotifierRegistry> {
    GLOBAL.load_full()
}

/// Whether `backend` is enabled in the process-wide registry.
pub fn is_enabled(backend: &str) -> bool {
    GLOBAL.load().is_enabled(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_builds_every_backend() {
        let registry = NotifierRegistry::from_config(&EventsConfigMap::new());
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["audit", "gateway", "infobip", "mailgun", "slack"]
        );
    }

    #[test]
    fn test_known_backends_default_to_disabled() {
        let registry = NotifierRegistry::from_config(&EventsConfigMap::new());
        for name in KNOWN_ENABLEMENT {
            assert!(!registry.is_enabled(name), "{} should be disabled", name);
        }
        assert!(registry.enabled_backends().is_empty());
    }

    #[test]
    fn test_enabled_flag_requires_truthy_value() {
        let config = EventsConfigMap::new()
            .with("mailgun", "enabled", "true")
            .with("slack", "enabled", "false")
            .with("infobip", "enabled", "yes")
            .with("bill", "enabled", "true")
            .with("audit", "enabled", "TRUE")
            .with("gateway", "enabled", " true ");
        let registry = NotifierRegistry::from_config(&config);

        assert!(registry.is_enabled("mailgun"));
        assert!(!registry.is_enabled("slack"));
        assert!(!registry.is_enabled("infobip"));
        assert!(registry.is_enabled("bill"));
        assert!(!registry.is_enabled("audit"));
        assert!(!registry.is_enabled("gateway"));
        assert_eq!(registry.enabled_backends(), vec!["bill", "mailgun"]);
    }

    #[test]
    fn test_unconfigured_name_is_not_enabled() {
        let config = EventsConfigMap::new().with("mail", "enabled", "true");
        let registry = NotifierRegistry::from_config(&config);
        assert!(registry.is_enabled("mail"));
        assert!(!registry.is_enabled("sms"));
        assert!(!registry.is_enabled(""));
    }
}
