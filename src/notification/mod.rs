//! Notification backends and the registry that assembles them.
//!
//! Each backend implements [`Notifier`](crate::core::Notifier) and is bound to
//! its own configuration slice. Backends never fail at construction; missing
//! credentials and bad endpoints surface as errors from `notify`, which the
//! dispatcher logs and aggregates.
pub mod audit;
pub mod gateway;
pub mod infobip;
pub mod mailgun;
pub mod registry;
pub mod slack;

use std::time::Duration;
use tracing::warn;

/// Per-request timeout for the HTTP relays.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The HTTP client shared by a relay for its lifetime.
pub(crate) fn http_client() -> reqwest::Client {
    match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
            reqwest::Client::new()
        }
    }
}

/// Turns a non-success response into an error carrying status and body.
pub(crate) async fn check_response(
    backend: &str,
    response: reqwest::Response,
) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!(
        "{} request failed: status {}, body: {}",
        backend,
        status,
        body
    );
}
