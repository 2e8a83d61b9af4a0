//! Shared fakes for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use eventwatch::core::{Event, EventAction, EventData, Notifier};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// An ordered log of everything notifiers and hooks did, shared between them.
#[derive(Clone, Default, Debug)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Entries starting with `prefix`, e.g. `"notify:slack"`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    /// Polls until at least `count` entries exist.
    pub async fn wait_for_len(&self, count: usize, timeout: Duration) {
        tokio::time::timeout(timeout, async {
            while self.entries.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for journal entries");
    }
}

/// A notifier that records each call as `notify:<name>:<action>[:<seq>]`.
pub struct RecordingNotifier {
    name: String,
    journal: Journal,
    failure: Option<String>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingNotifier {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            failure: None,
            gate: None,
        }
    }

    /// Makes every call fail with `message` (after recording it).
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Makes every call wait for a permit from `gate` before returning.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, action: &EventAction, data: &EventData) -> anyhow::Result<()> {
        match data.get("seq") {
            Some(seq) => self.journal.push(format!("notify:{}:{}:{}", self.name, action, seq)),
            None => self.journal.push(format!("notify:{}:{}", self.name, action)),
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        match &self.failure {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }
}

/// Builds an event carrying a sequence number in its payload.
pub fn numbered_event(action: &str, seq: usize) -> Event {
    Event::new(action).with("seq", seq.to_string())
}
