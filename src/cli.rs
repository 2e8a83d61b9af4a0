//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `eventwatch.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Dispatches platform lifecycle events to notification backends.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level (overrides the config file).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Capacity of the inbound event queue.
    #[arg(long, value_name = "EVENTS")]
    pub queue_capacity: Option<usize>,

    /// Report every notifier and hook failure instead of only the last one.
    #[arg(long)]
    pub collect_errors: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(capacity) = self.queue_capacity {
            dict.insert("queue_capacity".into(), Value::from(capacity as u64));
        }

        // Only an explicit flag overrides the configured policy.
        if self.collect_errors {
            dict.insert("error_policy".into(), Value::from("collect".to_string()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
