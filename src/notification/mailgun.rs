//! Mail relay backed by the Mailgun messages API.

use crate::config::BackendConfig;
use crate::constants::{API_KEY, API_URL, DOMAIN, EMAIL, MAILGUN, SENDER};
use crate::core::{EventAction, EventData, Notifier};
use crate::formatting::{subject, PlainTextFormatter, TextFormatter};
use crate::notification::{check_response, http_client};
use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

const DEFAULT_API_URL: &str = "https://api.mailgun.net/v3";

/// Mails each event to the address in its `email` field.
pub struct MailgunNotifier {
    config: BackendConfig,
    meta: BackendConfig,
    client: reqwest::Client,
}

impl MailgunNotifier {
    /// `meta` supplies the sender address shared with other backends.
    pub fn new(config: BackendConfig, meta: BackendConfig) -> Self {
        Self {
            config,
            meta,
            client: http_client(),
        }
    }

    fn sender(&self, domain: &str) -> String {
        self.config
            .non_empty(SENDER)
            .or_else(|| self.meta.non_empty(SENDER))
            .map(str::to_string)
            .unwrap_or_else(|| format!("notifications@{}", domain))
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    fn name(&self) -> &str {
        MAILGUN
    }

    #[instrument(skip(self, data), fields(backend = MAILGUN))]
    async fn notify(&self, action: &EventAction, data: &EventData) -> anyhow::Result<()> {
        if !self.config.is_enabled() {
            debug!("Mailgun is disabled, skipping");
            return Ok(());
        }
        let api_key = self
            .config
            .non_empty(API_KEY)
            .context("mailgun is enabled but no api_key is configured")?;
        let domain = self
            .config
            .non_empty(DOMAIN)
            .context("mailgun is enabled but no domain is configured")?;
        let Some(recipient) = data.get(EMAIL).filter(|e| !e.is_empty()) else {
            debug!("Event has no recipient address, skipping");
            return Ok(());
        };

        let base = self.config.non_empty(API_URL).unwrap_or(DEFAULT_API_URL);
        let url = format!("{}/{}/messages", base.trim_end_matches('/'), domain);
        let form = vec![
            ("from", self.sender(domain)),
            ("to", recipient.clone()),
            ("subject", subject(action, data)),
            ("text", PlainTextFormatter.format_event(action, data)),
        ];

        let response = self
            .client
            .post(url)
            .basic_auth("api", Some(api_key))
            .form(&form)
            .send()
            .await
            .context("HTTP request to Mailgun failed")?;
        check_response(MAILGUN, response).await?;

        info!(recipient = %recipient, "Sent event mail.");
        Ok(())
    }
}
