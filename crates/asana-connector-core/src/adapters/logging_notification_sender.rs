//! Notification sender that only logs the request.

use crate::platform::{ConnectorContext, HandlerError, NotificationResponse, NotificationSender};
use crate::profile::UserProfile;
use asana_sdk::AsanaApi;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Default [`NotificationSender`]; acknowledges with an empty 200.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationSender;

impl LoggingNotificationSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn send_notification(
        &self,
        _ctx: &ConnectorContext,
        profile: &UserProfile,
        _client: &dyn AsanaApi,
        payload: &Value,
    ) -> Result<NotificationResponse, HandlerError> {
        info!(
            vendor_user_id = %profile.vendor_user_id,
            has_payload = !payload.is_null(),
            "Notification requested, no sender configured"
        );
        Ok(NotificationResponse::default())
    }
}
