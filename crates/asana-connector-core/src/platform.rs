//! # Platform Collaborators
//!
//! Interfaces to everything the hosting platform owns: user persistence,
//! OAuth token access, vendor client construction, the application's event
//! and notification hooks, and the self-relay transport.
//!
//! The dispatcher, lifecycle manager and profile adapter receive these as
//! `Arc<dyn _>` dependencies.

use crate::dispatcher::InboundWebhook;
use crate::profile::{UserKey, UserProfile};
use crate::{ConnectorError, StorageError, WebhookId};
use asana_sdk::{AsanaApi, TokenContext, TokenError, WebhookEvent};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Error type returned by application event handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Per-request context handed to every collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorContext {
    /// Public URL the vendor reaches this connector on, without a trailing slash.
    pub base_url: String,

    /// Correlation id for logs.
    pub request_id: String,
}

impl ConnectorContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

/// Persistence for user profiles.
///
/// Reads must observe earlier writes; the lifecycle manager relies on that to
/// detect a handshake that landed while a subscription was being created.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(
        &self,
        ctx: &ConnectorContext,
        key: &UserKey,
    ) -> Result<Option<UserProfile>, StorageError>;

    async fn save_user(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
    ) -> Result<(), StorageError>;
}

/// Access to a usable OAuth token for a profile.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn ensure_access_token(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
    ) -> Result<TokenContext, TokenError>;
}

/// Builds an authenticated Asana client for a profile.
#[async_trait]
pub trait VendorClientFactory: Send + Sync {
    async fn create_client(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
    ) -> Result<Arc<dyn AsanaApi>, ConnectorError>;
}

/// Application hook receiving verified webhook events.
///
/// Failures are logged by the dispatcher and never reach the vendor.
#[async_trait]
pub trait WebhookEventHandler: Send + Sync {
    async fn on_webhook_event(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
        webhook_id: WebhookId,
        events: &[WebhookEvent],
    ) -> Result<(), HandlerError>;
}

/// Status and optional JSON body returned by a [`NotificationSender`].
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl NotificationResponse {
    pub fn new(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl Default for NotificationResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Application hook sending an outbound notification on behalf of a user.
///
/// `payload` is the JSON body posted to the notification route, or `Null`
/// when none was sent. A failure becomes a 500 for the caller.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_notification(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
        client: &dyn AsanaApi,
        payload: &Value,
    ) -> Result<NotificationResponse, HandlerError>;
}

/// Errors raised while re-posting a webhook to this connector.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Relay request failed: {message}")]
    RequestFailed { message: String },

    #[error("Relay returned status {status}")]
    UnexpectedStatus { status: u16 },
}

/// Re-posts a verified delivery back to this connector with the dispatch marker set.
#[async_trait]
pub trait SelfRelay: Send + Sync {
    async fn relay(&self, ctx: &ConnectorContext, request: &InboundWebhook)
        -> Result<(), RelayError>;
}
