//! Internal audit sink: appends one JSON line per event to a local file.

use crate::config::BackendConfig;
use crate::constants::{AUDIT, AUDIT_LOG};
use crate::core::{EventAction, EventData, Notifier};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct AuditRecord<'a> {
    timestamp: String,
    action: &'a EventAction,
    data: &'a EventData,
}

/// Writes every event to the file named by `meta.audit_log`.
pub struct AuditSink {
    path: Option<PathBuf>,
    // Serializes appends so records from concurrent watchers never interleave.
    write_lock: Mutex<()>,
}

impl AuditSink {
    pub fn new(meta: BackendConfig) -> Self {
        Self {
            path: meta.non_empty(AUDIT_LOG).map(PathBuf::from),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Notifier for AuditSink {
    fn name(&self) -> &str {
        AUDIT
    }

    #[instrument(skip(self, data), fields(backend = AUDIT))]
    async fn notify(&self, action: &EventAction, data: &EventData) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            debug!("No audit log configured, skipping");
            return Ok(());
        };

        let record = AuditRecord {
            timestamp: Utc::now().to_rfc3339(),
            action,
            data,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open audit log {}", path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to write audit log {}", path.display()))?;
        file.flush().await?;
        Ok(())
    }
}
