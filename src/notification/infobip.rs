//! SMS relay backed by the Infobip text messaging API.

use crate::config::BackendConfig;
use crate::constants::{API_URL, APPLICATION_ID, INFOBIP, PASSWORD, PHONE, USERNAME};
use crate::core::{EventAction, EventData, Notifier};
use crate::formatting::{PlainTextFormatter, TextFormatter};
use crate::notification::{check_response, http_client};
use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument};

const DEFAULT_API_URL: &str = "https://api.infobip.com";
const DEFAULT_SENDER: &str = "eventwatch";

#[derive(Serialize)]
struct Destination<'a> {
    to: &'a str,
}

#[derive(Serialize)]
struct Message<'a> {
    from: &'a str,
    destinations: Vec<Destination<'a>>,
    text: String,
}

#[derive(Serialize)]
struct SmsRequest<'a> {
    messages: Vec<Message<'a>>,
}

/// Texts each event to the number in its `phone` field.
pub struct InfobipNotifier {
    config: BackendConfig,
    client: reqwest::Client,
}

impl InfobipNotifier {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            client: http_client(),
        }
    }
}

#[async_trait]
impl Notifier for InfobipNotifier {
    fn name(&self) -> &str {
        INFOBIP
    }

    #[instrument(skip(self, data), fields(backend = INFOBIP))]
    async fn notify(&self, action: &EventAction, data: &EventData) -> anyhow::Result<()> {
        if !self.config.is_enabled() {
            debug!("Infobip is disabled, skipping");
            return Ok(());
        }
        let username = self
            .config
            .non_empty(USERNAME)
            .context("infobip is enabled but no username is configured")?;
        let password = self
            .config
            .non_empty(PASSWORD)
            .context("infobip is enabled but no password is configured")?;
        let Some(phone) = data.get(PHONE).filter(|p| !p.is_empty()) else {
            debug!("Event has no phone number, skipping");
            return Ok(());
        };

        let request = SmsRequest {
            messages: vec![Message {
                from: self.config.non_empty(APPLICATION_ID).unwrap_or(DEFAULT_SENDER),
                destinations: vec![Destination { to: phone }],
                text: PlainTextFormatter.format_event(action, data),
            }],
        };
        let base = self.config.non_empty(API_URL).unwrap_or(DEFAULT_API_URL);
        let url = format!("{}/sms/2/text/advanced", base.trim_end_matches('/'));

        let response = self
            .client
            .post(url)
            .basic_auth(username, Some(password))
            .json(&request)
            .send()
            .await
            .context("HTTP request to Infobip failed")?;
        check_response(INFOBIP, response).await?;

        info!("Sent event SMS.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: &str) -> BackendConfig {
        [
            ("enabled", "true"),
            ("username", "ops"),
            ("password", "secret"),
            ("application_id", "Megam"),
            ("url", url),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_sms_request_shape() {
        let server = MockServer::start().await;
        let data: EventData = [("phone".to_string(), "+15550100".to_string())]
            .into_iter()
            .collect();
        let expected = json!({
            "messages": [{
                "from": "Megam",
                "destinations": [{ "to": "+15550100" }],
                "text": "Event: insufficient_fund\nphone: +15550100",
            }]
        });

        Mock::given(method("POST"))
            .and(path("/sms/2/text/advanced"))
            .and(body_json(&expected))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = InfobipNotifier::new(config(&server.uri()));
        let result = notifier
            .notify(&EventAction::from("insufficient_fund"), &data)
            .await;
        assert!(result.is_ok(), "{:?}", result);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_at_notify() {
        let config: BackendConfig = [("enabled", "true")].into_iter().collect();
        let notifier = InfobipNotifier::new(config);
        assert!(notifier
            .notify(&EventAction::from("launched"), &EventData::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_disabled_infobip_is_skipped() {
        let notifier = InfobipNotifier::new(BackendConfig::new());
        assert!(notifier
            .notify(&EventAction::from("launched"), &EventData::new())
            .await
            .is_ok());
    }
}
