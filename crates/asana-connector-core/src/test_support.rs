//! Hand-written doubles shared by the unit tests.

#![allow(dead_code)]

use crate::adapters::InMemoryUserStore;
use crate::dispatcher::InboundWebhook;
use crate::platform::{
    ConnectorContext, HandlerError, RelayError, SelfRelay, UserStore, WebhookEventHandler,
};
use crate::profile::{UserKey, UserProfile, VendorIdentity};
use crate::registry::WebhookRecordUpdate;
use crate::{StorageError, VendorUserId, WebhookId};
use asana_sdk::client::{AsanaUser, CreateWebhookRequest, Webhook};
use asana_sdk::{ApiError, AsanaApi, WebhookEvent};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub fn ctx() -> ConnectorContext {
    ConnectorContext::new("https://connector.example.com").with_request_id("test-request")
}

pub fn user_key(user: &str) -> UserKey {
    UserKey::new(VendorUserId::new(user).unwrap())
}

pub fn profile(user: &str) -> UserProfile {
    UserProfile::new(
        user_key(user),
        VendorIdentity {
            gid: user.to_string(),
            name: Some("Test User".to_string()),
            email: None,
        },
    )
}

/// Simulates Asana delivering the handshake during `create_webhook`.
pub struct HandshakeSimulation {
    pub store: InMemoryUserStore,
    pub key: UserKey,
    pub secret: String,
}

/// Mock Asana API recording every call.
#[derive(Default)]
pub struct MockAsanaApi {
    pub created: Arc<Mutex<Vec<CreateWebhookRequest>>>,
    pub deleted: Arc<Mutex<Vec<String>>>,
    pub identity_calls: Arc<Mutex<u32>>,
    pub created_gid: String,
    pub handshake: Option<HandshakeSimulation>,
    pub fail_create: bool,
    pub fail_identity_status: Option<u16>,
    pub failing_deletes: HashSet<String>,
}

impl MockAsanaApi {
    pub fn new(created_gid: &str) -> Self {
        Self {
            created_gid: created_gid.to_string(),
            ..Self::default()
        }
    }

    pub fn with_handshake(mut self, store: InMemoryUserStore, key: UserKey, secret: &str) -> Self {
        self.handshake = Some(HandshakeSimulation {
            store,
            key,
            secret: secret.to_string(),
        });
        self
    }

    pub fn failing_delete(mut self, gid: &str) -> Self {
        self.failing_deletes.insert(gid.to_string());
        self
    }

    pub fn deleted_gids(&self) -> Vec<String> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort();
        deleted
    }
}

#[async_trait]
impl AsanaApi for MockAsanaApi {
    async fn get_identity(&self) -> Result<AsanaUser, ApiError> {
        *self.identity_calls.lock().unwrap() += 1;
        if let Some(status) = self.fail_identity_status {
            return Err(ApiError::HttpError {
                status,
                code: Some("forbidden".to_string()),
                message: "Not allowed".to_string(),
            });
        }

        Ok(AsanaUser {
            gid: "1201".to_string(),
            name: Some("Test User".to_string()),
            email: Some("test@example.com".to_string()),
            resource_type: Some("user".to_string()),
        })
    }

    async fn create_webhook(&self, request: &CreateWebhookRequest) -> Result<Webhook, ApiError> {
        self.created.lock().unwrap().push(request.clone());

        if self.fail_create {
            return Err(ApiError::HttpError {
                status: 400,
                code: Some("invalid_request".to_string()),
                message: "resource: Not a valid resource".to_string(),
            });
        }

        if let Some(handshake) = &self.handshake {
            let webhook_id: WebhookId = request
                .target
                .rsplit('/')
                .next()
                .unwrap()
                .parse()
                .unwrap();
            let ctx = ctx();
            let mut stored = handshake
                .store
                .get_user(&ctx, &handshake.key)
                .await
                .unwrap()
                .unwrap();
            stored
                .webhooks
                .put(webhook_id, WebhookRecordUpdate::secret(handshake.secret.clone()));
            handshake.store.save_user(&ctx, &stored).await.unwrap();
        }

        Ok(Webhook {
            gid: self.created_gid.clone(),
            resource: None,
            target: Some(request.target.clone()),
            active: true,
        })
    }

    async fn delete_webhook(&self, webhook_gid: &str) -> Result<(), ApiError> {
        self.deleted.lock().unwrap().push(webhook_gid.to_string());

        if self.failing_deletes.contains(webhook_gid) {
            return Err(ApiError::HttpError {
                status: 500,
                code: Some("server_error".to_string()),
                message: "Something went wrong".to_string(),
            });
        }
        Ok(())
    }
}

/// Wraps an in-memory store and fails reads or writes on demand.
///
/// The inner store stays reachable through `inner`, so a handshake simulated
/// against it still succeeds.
#[derive(Default)]
pub struct FailingStore {
    pub inner: InMemoryUserStore,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

#[async_trait]
impl UserStore for FailingStore {
    async fn get_user(
        &self,
        ctx: &ConnectorContext,
        key: &UserKey,
    ) -> Result<Option<UserProfile>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::ReadFailed {
                key: key.storage_key(),
                message: "store offline".to_string(),
            });
        }
        self.inner.get_user(ctx, key).await
    }

    async fn save_user(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
    ) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteFailed {
                key: profile.key().storage_key(),
                message: "store offline".to_string(),
            });
        }
        self.inner.save_user(ctx, profile).await
    }
}

/// Event handler recording each invocation.
#[derive(Default)]
pub struct RecordingHandler {
    pub calls: Arc<Mutex<Vec<(WebhookId, Vec<WebhookEvent>)>>>,
    pub fail: bool,
}

impl RecordingHandler {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl WebhookEventHandler for RecordingHandler {
    async fn on_webhook_event(
        &self,
        _ctx: &ConnectorContext,
        _profile: &UserProfile,
        webhook_id: WebhookId,
        events: &[WebhookEvent],
    ) -> Result<(), HandlerError> {
        self.calls
            .lock()
            .unwrap()
            .push((webhook_id, events.to_vec()));

        if self.fail {
            return Err("handler exploded".into());
        }
        Ok(())
    }
}

/// Self-relay recording each relayed request.
#[derive(Default)]
pub struct RecordingRelay {
    pub requests: Arc<Mutex<Vec<InboundWebhook>>>,
    pub fail: bool,
}

#[async_trait]
impl SelfRelay for RecordingRelay {
    async fn relay(
        &self,
        _ctx: &ConnectorContext,
        request: &InboundWebhook,
    ) -> Result<(), RelayError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            return Err(RelayError::UnexpectedStatus { status: 502 });
        }
        Ok(())
    }
}
