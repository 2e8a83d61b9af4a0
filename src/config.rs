//! Configuration management for eventwatch
//!
//! This module defines the main `Config` struct and the per-backend
//! configuration map consumed by the notifier registry. It uses the `figment`
//! crate to load configuration from an `eventwatch.toml` file and merge it
//! with environment variables and command-line arguments.

use crate::cli::Cli;
use crate::constants::{ENABLED, TRUE};
use crate::dispatch::ErrorPolicy;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Capacity of the inbound event queue.
    pub queue_capacity: usize,
    /// How failures from several notifiers or hooks are reported.
    pub error_policy: ErrorPolicy,
    /// Per-backend settings, keyed by backend name.
    #[serde(default)]
    pub events: EventsConfigMap,
}

impl Config {
    /// Loads the application configuration by layering defaults, the TOML file
    /// named on the command line, `EVENTWATCH_` environment variables and
    /// finally the command-line arguments themselves.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            // e.g. EVENTWATCH_EVENTS__SLACK__ENABLED=true
            .merge(Env::prefixed("EVENTWATCH_").split("__"))
            .merge(cli)
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            queue_capacity: 1024,
            error_policy: ErrorPolicy::LastWins,
            events: EventsConfigMap::default(),
        }
    }
}

/// Returns true only for the exact reserved "enabled" value, `true`.
pub fn is_truthy(value: &str) -> bool {
    value == TRUE
}

/// String settings for a single backend.
///
/// Scalar TOML or environment values (booleans, numbers) are stored in their
/// string form, so `enabled = true` and `enabled = "true"` mean the same.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BackendConfig(HashMap<String, String>);

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Like `get`, but treats blank values as missing.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Whether this slice carries the reserved enabled flag set to a truthy value.
    pub fn is_enabled(&self) -> bool {
        self.get(ENABLED).is_some_and(is_truthy)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BackendConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'de> Deserialize<'de> for BackendConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Str(String),
            Bool(bool),
            Int(i64),
            Float(f64),
        }

        let raw = HashMap::<String, Scalar>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Scalar::Str(s) => s,
                        Scalar::Bool(b) => b.to_string(),
                        Scalar::Int(i) => i.to_string(),
                        Scalar::Float(f) => f.to_string(),
                    };
                    (key, value)
                })
                .collect(),
        ))
    }
}

/// Backend name to backend settings. Read once when the registry is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventsConfigMap(HashMap<String, BackendConfig>);

impl EventsConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slice for `backend`, or an empty one if it is not configured.
    pub fn get(&self, backend: &str) -> BackendConfig {
        self.0.get(backend).cloned().unwrap_or_default()
    }

    /// Sets a single key, builder style.
    pub fn with(mut self, backend: &str, key: &str, value: &str) -> Self {
        self.0
            .entry(backend.to_string())
            .or_default()
            .insert(key, value);
        self
    }

    pub fn insert(&mut self, backend: impl Into<String>, config: BackendConfig) {
        self.0.insert(backend.into(), config);
    }

    /// Iterates over configured backends and their settings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BackendConfig)> {
        self.0.iter().map(|(name, config)| (name.as_str(), config))
    }
}
