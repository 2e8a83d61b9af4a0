//! Internal sink forwarding events to the platform gateway API, which keeps
//! billing and usage records.

use crate::config::BackendConfig;
use crate::constants::{API_URL, GATEWAY, VERTICE_APIKEY, VERTICE_EMAIL};
use crate::core::{EventAction, EventData, Notifier};
use crate::notification::{check_response, http_client};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, instrument};

pub struct GatewayNotifier {
    meta: BackendConfig,
    client: reqwest::Client,
}

impl GatewayNotifier {
    pub fn new(meta: BackendConfig) -> Self {
        Self {
            meta,
            client: http_client(),
        }
    }
}

#[async_trait]
impl Notifier for GatewayNotifier {
    fn name(&self) -> &str {
        GATEWAY
    }

    #[instrument(skip(self, data), fields(backend = GATEWAY))]
    async fn notify(&self, action: &EventAction, data: &EventData) -> anyhow::Result<()> {
        let Some(base) = self.meta.non_empty(API_URL) else {
            debug!("No gateway url configured, skipping");
            return Ok(());
        };
        let email = self
            .meta
            .non_empty(VERTICE_EMAIL)
            .context("gateway url is set but no vertice_email is configured")?;
        let api_key = self
            .meta
            .non_empty(VERTICE_APIKEY)
            .context("gateway url is set but no vertice_apikey is configured")?;

        let payload = json!({
            "action": action,
            "data": data,
            "created_at": Utc::now().to_rfc3339(),
        });
        let response = self
            .client
            .post(format!("{}/events", base.trim_end_matches('/')))
            .header("X-Email", email)
            .header("X-Api-Key", api_key)
            .json(&payload)
            .send()
            .await
            .context("HTTP request to gateway failed")?;
        check_response(GATEWAY, response).await?;
        Ok(())
    }
}
