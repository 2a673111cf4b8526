//! HTTP implementation of the self-relay.
//!
//! Re-posts a verified delivery to this connector's own webhook URL with the
//! dispatch marker appended, so the original request can be acknowledged
//! immediately while the marked copy does the work.

use asana_connector_core::{
    ConnectorContext, InboundWebhook, RelayError, SelfRelay, WebhookLifecycleManager,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Hop-by-hop and framing headers that must not be copied onto the relayed request.
const SKIPPED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
    "keep-alive",
    "upgrade",
];

/// [`SelfRelay`] that POSTs back to `{base_url}/webhook/...?{marker}`.
#[derive(Debug, Clone)]
pub struct HttpSelfRelay {
    client: reqwest::Client,
    marker: String,
}

impl HttpSelfRelay {
    /// Create a relay using `marker` as the dispatch query flag.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::RequestFailed` if the HTTP client cannot be built.
    pub fn new(marker: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::RequestFailed {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            marker: marker.into(),
        })
    }

    /// URL the relayed copy of `request` is posted to.
    pub fn relay_url(&self, ctx: &ConnectorContext, request: &InboundWebhook) -> String {
        let callback =
            WebhookLifecycleManager::callback_url(&ctx.base_url, &request.key, &request.webhook_id);
        format!("{}?{}", callback, self.marker)
    }
}

#[async_trait]
impl SelfRelay for HttpSelfRelay {
    async fn relay(
        &self,
        ctx: &ConnectorContext,
        request: &InboundWebhook,
    ) -> Result<(), RelayError> {
        let url = self.relay_url(ctx, request);

        let mut builder = self.client.post(&url).body(request.body.clone());
        for (name, value) in &request.headers {
            if SKIPPED_HEADERS.contains(&name.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RelayError::RequestFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        debug!(url = %url, "Relayed webhook delivery");
        Ok(())
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
