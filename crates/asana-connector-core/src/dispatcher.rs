//! # Event Dispatcher
//!
//! Decides what an inbound webhook POST is and what the vendor should be told.
//!
//! Rules, evaluated in order:
//!
//! 1. No profile resolved for the path: reject (410).
//! 2. `X-Hook-Secret` present: handshake. Store the secret, persist the
//!    profile, echo the header back (200).
//! 3. Otherwise the delivery must carry a valid `X-Hook-Signature` for the
//!    webhook's stored secret. Unknown webhook or bad signature: reject (410).
//! 4. Verified: hand the events to the application handler and answer 200
//!    whatever the handler does.
//!
//! When self-relay is enabled, a verified delivery that does not yet carry the
//! dispatch marker is re-posted to this connector on a detached task and
//! acknowledged after a short delay; the marked copy takes step 4.

use crate::platform::{ConnectorContext, SelfRelay, UserStore, WebhookEventHandler};
use crate::profile::{UserKey, UserProfile};
use crate::registry::WebhookRecordUpdate;
use crate::{ConnectorResult, WebhookId};
use asana_sdk::webhook::{HOOK_SECRET_HEADER, HOOK_SIGNATURE_HEADER};
use asana_sdk::{EventBatch, SignatureVerifier};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Default delay before acknowledging a relayed delivery.
pub const DEFAULT_RELAY_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// Request and Outcome Types
// ============================================================================

/// An inbound webhook POST as the dispatcher sees it.
#[derive(Clone)]
pub struct InboundWebhook {
    /// User the callback path addresses.
    pub key: UserKey,

    pub webhook_id: WebhookId,

    /// Request headers, names lower-cased.
    pub headers: HashMap<String, String>,

    /// Raw request body, exactly as received.
    pub body: Bytes,

    /// Set when the request carries the dispatch marker, i.e. it is the relayed copy.
    pub relayed: bool,
}

impl InboundWebhook {
    pub fn new(key: UserKey, webhook_id: WebhookId, body: Bytes) -> Self {
        Self {
            key,
            webhook_id,
            headers: HashMap::new(),
            body,
            relayed: false,
        }
    }

    /// Add a header; the name is stored lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_ascii_lowercase(), value);
        }
        self
    }

    pub fn relayed(mut self, relayed: bool) -> Self {
        self.relayed = relayed;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Handshake secret, if this is a handshake.
    pub fn hook_secret(&self) -> Option<&str> {
        self.header(HOOK_SECRET_HEADER)
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
    }

    pub fn hook_signature(&self) -> Option<&str> {
        self.header(HOOK_SIGNATURE_HEADER)
    }
}

impl fmt::Debug for InboundWebhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundWebhook")
            .field("key", &self.key)
            .field("webhook_id", &self.webhook_id)
            .field("header_names", &self.headers.keys().collect::<Vec<_>>())
            .field("body_len", &self.body.len())
            .field("relayed", &self.relayed)
            .finish()
    }
}

/// Why a delivery was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ProfileNotFound,
    WebhookUnknown,
    SignatureInvalid,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileNotFound => "profile_not_found",
            Self::WebhookUnknown => "webhook_unknown",
            Self::SignatureInvalid => "signature_invalid",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to answer the vendor.
#[derive(Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handshake completed; echo `secret` in `X-Hook-Secret`.
    Handshake { secret: String },

    /// Delivery accepted (processed, relayed, or handler failed).
    Accepted,

    /// Delivery refused; the vendor should stop sending.
    Rejected { reason: RejectReason },
}

impl DispatchOutcome {
    /// HTTP status for the response.
    ///
    /// Rejections use 410 Gone so the vendor disables the subscription rather
    /// than retrying.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Handshake { .. } | Self::Accepted => 200,
            Self::Rejected { .. } => 410,
        }
    }

    pub fn hook_secret(&self) -> Option<&str> {
        match self {
            Self::Handshake { secret } => Some(secret),
            _ => None,
        }
    }
}

impl fmt::Debug for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake { .. } => f
                .debug_struct("Handshake")
                .field("secret", &"<REDACTED>")
                .finish(),
            Self::Accepted => f.write_str("Accepted"),
            Self::Rejected { reason } => f.debug_struct("Rejected").field("reason", reason).finish(),
        }
    }
}

/// Self-relay settings.
#[derive(Clone)]
pub struct RelayPolicy {
    pub relay: Arc<dyn SelfRelay>,

    /// How long to wait before acknowledging the original delivery.
    pub delay: Duration,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Handshake, verification and dispatch for inbound webhook deliveries.
pub struct EventDispatcher {
    store: Arc<dyn UserStore>,
    handler: Arc<dyn WebhookEventHandler>,
    relay: Option<RelayPolicy>,
}

impl EventDispatcher {
    /// Create a dispatcher that hands verified events straight to `handler`.
    pub fn new(store: Arc<dyn UserStore>, handler: Arc<dyn WebhookEventHandler>) -> Self {
        Self {
            store,
            handler,
            relay: None,
        }
    }

    /// Enable self-relay for unmarked deliveries.
    pub fn with_relay(mut self, relay: Arc<dyn SelfRelay>, delay: Duration) -> Self {
        self.relay = Some(RelayPolicy { relay, delay });
        self
    }

    pub fn relay_enabled(&self) -> bool {
        self.relay.is_some()
    }

    /// Process one inbound delivery.
    ///
    /// # Errors
    ///
    /// Only a failure to persist the handshake secret is returned; every
    /// verification failure is a [`DispatchOutcome::Rejected`].
    #[instrument(
        skip(self, ctx, profile, request),
        fields(
            request_id = %ctx.request_id,
            vendor_user_id = %request.key.vendor_user_id,
            webhook_id = %request.webhook_id,
            relayed = request.relayed,
        )
    )]
    pub async fn dispatch(
        &self,
        ctx: &ConnectorContext,
        profile: Option<UserProfile>,
        request: InboundWebhook,
    ) -> ConnectorResult<DispatchOutcome> {
        let Some(mut profile) = profile else {
            warn!("No user profile for webhook delivery, rejecting");
            return Ok(DispatchOutcome::Rejected {
                reason: RejectReason::ProfileNotFound,
            });
        };

        if let Some(secret) = request.hook_secret() {
            let secret = secret.to_string();
            profile
                .webhooks
                .put(request.webhook_id, WebhookRecordUpdate::secret(secret.clone()));
            self.store.save_user(ctx, &profile).await?;

            info!("Webhook handshake completed");
            return Ok(DispatchOutcome::Handshake { secret });
        }

        let secret = profile
            .webhooks
            .get(&request.webhook_id)
            .and_then(|record| record.secret());
        let Some(secret) = secret else {
            warn!("Delivery for unknown or pending webhook, rejecting");
            return Ok(DispatchOutcome::Rejected {
                reason: RejectReason::WebhookUnknown,
            });
        };

        let signature = request.hook_signature().unwrap_or_default();
        if !SignatureVerifier::verify(Some(secret), signature, &request.body) {
            warn!("Webhook signature verification failed, rejecting");
            return Ok(DispatchOutcome::Rejected {
                reason: RejectReason::SignatureInvalid,
            });
        }

        match &self.relay {
            Some(policy) if !request.relayed => {
                self.spawn_relay(ctx, policy, request);
                tokio::time::sleep(policy.delay).await;
                Ok(DispatchOutcome::Accepted)
            }
            _ => {
                self.deliver(ctx, &profile, &request).await;
                Ok(DispatchOutcome::Accepted)
            }
        }
    }

    fn spawn_relay(&self, ctx: &ConnectorContext, policy: &RelayPolicy, request: InboundWebhook) {
        let relay = Arc::clone(&policy.relay);
        let ctx = ctx.clone();

        debug!("Relaying verified delivery for asynchronous processing");
        tokio::spawn(async move {
            match relay.relay(&ctx, &request).await {
                Ok(()) => debug!(
                    webhook_id = %request.webhook_id,
                    "Self-relay completed"
                ),
                Err(e) => error!(
                    webhook_id = %request.webhook_id,
                    error = %e,
                    "Self-relay failed"
                ),
            }
        });
    }

    async fn deliver(&self, ctx: &ConnectorContext, profile: &UserProfile, request: &InboundWebhook) {
        let batch = match EventBatch::from_slice(&request.body) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Verified delivery is not a valid event batch, treating as empty");
                EventBatch::default()
            }
        };

        debug!(event_count = batch.events.len(), "Dispatching webhook events");

        if let Err(e) = self
            .handler
            .on_webhook_event(ctx, profile, request.webhook_id, &batch.events)
            .await
        {
            error!(error = %e, "Webhook event handler failed");
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
