//! A client for posting event notifications to Slack.

use crate::config::BackendConfig;
use crate::constants::{API_URL, CHANNEL, SLACK, TOKEN};
use crate::core::{EventAction, EventData, Notifier};
use crate::formatting::{SlackTextFormatter, TextFormatter};
use crate::notification::{check_response, http_client};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Posts each event to a Slack channel through `chat.postMessage`.
pub struct SlackNotifier {
    config: BackendConfig,
    formatter: Box<dyn TextFormatter>,
    client: reqwest::Client,
}

impl SlackNotifier {
    /// Creates a new `SlackNotifier`.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            formatter: Box::new(SlackTextFormatter),
            client: http_client(),
        }
    }

    fn endpoint(&self) -> String {
        let base = self.config.non_empty(API_URL).unwrap_or(DEFAULT_API_URL);
        format!("{}/chat.postMessage", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        SLACK
    }

    /// Formats and sends the event to the configured channel.
    #[instrument(skip(self, data), fields(backend = SLACK))]
    async fn notify(&self, action: &EventAction, data: &EventData) -> anyhow::Result<()> {
        if !self.config.is_enabled() {
            debug!("Slack is disabled, skipping");
            return Ok(());
        }
        let token = self
            .config
            .non_empty(TOKEN)
            .context("slack is enabled but no token is configured")?;
        let channel = self
            .config
            .non_empty(CHANNEL)
            .context("slack is enabled but no channel is configured")?;

        let payload = json!({
            "channel": channel,
            "text": self.formatter.format_event(action, data),
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .context("HTTP request to Slack failed")?;
        let body: Value = check_response(SLACK, response)
            .await?
            .json()
            .await
            .context("Slack returned an unreadable response")?;

        // Slack reports API errors with a 200 and `ok: false`.
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let reason = body.get("error").and_then(Value::as_str).unwrap_or("unknown");
            anyhow::bail!("Slack rejected the message: {}", reason);
        }

        info!("Successfully sent event to Slack.");
        Ok(())
    }
}

#[cfg(test)]
mod slack_client_tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn enabled_config(url: &str) -> BackendConfig {
        [
            ("enabled", "true"),
            ("token", "xoxb-test"),
            ("channel", "#ops"),
            ("url", url),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_slack_notify_success() {
        // Arrange
        let server = MockServer::start().await;
        let action = EventAction::from("destroyed");
        let data = EventData::new();
        let expected_body = json!({ "channel": "#ops", "text": "*destroyed*" });

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_json(&expected_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(enabled_config(&server.uri()));

        // Act
        let result = notifier.notify(&action, &data).await;

        // Assert
        assert!(result.is_ok(), "{:?}", result);
    }

    #[tokio::test]
    async fn test_slack_notify_handles_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
            )
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(enabled_config(&server.uri()));
        let err = notifier
            .notify(&EventAction::from("destroyed"), &EventData::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("channel_not_found"));
    }

    #[tokio::test]
    async fn test_slack_notify_handles_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(enabled_config(&server.uri()));
        let result = notifier
            .notify(&EventAction::from("destroyed"), &EventData::new())
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_disabled_slack_is_skipped() {
        let notifier = SlackNotifier::new(BackendConfig::new());
        assert!(notifier
            .notify(&EventAction::from("destroyed"), &EventData::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_enabled_slack_without_token_fails() {
        let config: BackendConfig = [("enabled", "true"), ("channel", "#ops")].into_iter().collect();
        let notifier = SlackNotifier::new(config);
        let err = notifier
            .notify(&EventAction::from("destroyed"), &EventData::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no token"));
    }
}
