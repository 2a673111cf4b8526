//! Event handler that only logs what it receives.

use crate::platform::{ConnectorContext, HandlerError, WebhookEventHandler};
use crate::profile::UserProfile;
use crate::WebhookId;
use asana_sdk::WebhookEvent;
use async_trait::async_trait;
use tracing::{debug, info};

/// Default [`WebhookEventHandler`]; applications replace it with their own.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventHandler;

impl LoggingEventHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WebhookEventHandler for LoggingEventHandler {
    async fn on_webhook_event(
        &self,
        _ctx: &ConnectorContext,
        profile: &UserProfile,
        webhook_id: WebhookId,
        events: &[WebhookEvent],
    ) -> Result<(), HandlerError> {
        info!(
            vendor_user_id = %profile.vendor_user_id,
            webhook_id = %webhook_id,
            event_count = events.len(),
            "Received webhook events"
        );

        for event in events {
            debug!(
                webhook_id = %webhook_id,
                action = event.action.as_deref().unwrap_or("unknown"),
                resource = event.resource.as_ref().map(|r| r.gid.as_str()).unwrap_or(""),
                "Webhook event"
            );
        }

        Ok(())
    }
}
