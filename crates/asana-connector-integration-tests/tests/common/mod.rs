//! Common test utilities for asana-connector integration tests
//!
//! This module provides:
//! - A connector wired with the shipped token provider and Asana client
//!   factory, pointed at a wiremock Asana API
//! - A wiremock responder that performs the `X-Hook-Secret` handshake
//!   against the connector before answering a webhook create
//! - A recording event handler and request builders

#![allow(dead_code)]

use asana_connector_api::{create_router, AppState, ServiceConfig};
use asana_connector_core::adapters::{AsanaClientFactory, InMemoryUserStore, StoredTokenProvider};
use asana_connector_core::{
    ConnectorContext, HandlerError, UserKey, UserProfile, UserStore, VendorId, VendorIdentity,
    VendorUserId, WebhookEventHandler, WebhookId, WebhookRecordUpdate,
};
use asana_sdk::auth::{AccessToken, TokenContext};
use asana_sdk::{SignatureVerifier, WebhookEvent};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::{MockServer, Request as MockRequest, Respond, ResponseTemplate};

pub const BASE_URL: &str = "https://connector.example.com";
pub const USER_ID: &str = "1201";
pub const ACCESS_TOKEN: &str = "0/test-access-token";

// ============================================================================
// Recording event handler
// ============================================================================

/// Records every batch handed to the application.
#[derive(Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<(WebhookId, Vec<WebhookEvent>)>>>,
}

impl RecordingHandler {
    pub fn calls(&self) -> Vec<(WebhookId, Vec<WebhookEvent>)> {
        self.calls.lock().unwrap().clone()
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
        Ok(())
    }
}

// ============================================================================
// Connector under test
// ============================================================================

/// A connector instance backed by an in-memory store and a mocked Asana API.
pub struct TestConnector {
    pub asana: MockServer,
    pub store: InMemoryUserStore,
    pub handler: Arc<RecordingHandler>,
    pub router: Router,
}

impl TestConnector {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start with a configuration tweak applied on top of the test defaults.
    pub async fn start_with(configure: impl FnOnce(&mut ServiceConfig)) -> Self {
        let asana = MockServer::start().await;
        let store = InMemoryUserStore::new();
        let handler = Arc::new(RecordingHandler::default());

        let mut config = ServiceConfig::default();
        config.connector.base_url = BASE_URL.to_string();
        config.asana.api_url = asana.uri();
        configure(&mut config);

        let clients = Arc::new(AsanaClientFactory::new(
            Arc::new(StoredTokenProvider::new()),
            config.asana.client_config(),
        ));
        let state = AppState::new(config, Arc::new(store.clone()), clients, handler.clone())
            .expect("application state");

        Self {
            asana,
            store,
            handler,
            router: create_router(state),
        }
    }

    pub async fn seed_user(&self) -> UserProfile {
        let profile = user_profile();
        self.store.save_user(&ctx(), &profile).await.unwrap();
        profile
    }

    pub async fn stored_user(&self) -> Option<UserProfile> {
        self.store.get_user(&ctx(), &user_key()).await.unwrap()
    }

    /// Seed the test user scoped under `vendor_id`.
    pub async fn seed_vendor_user(&self, vendor_id: &str) -> UserProfile {
        let mut profile = user_profile();
        profile.vendor_id = Some(VendorId::new(vendor_id).unwrap());
        self.store.save_user(&ctx(), &profile).await.unwrap();
        profile
    }

    pub async fn stored_vendor_user(&self, vendor_id: &str) -> Option<UserProfile> {
        self.store
            .get_user(&ctx(), &vendor_user_key(vendor_id))
            .await
            .unwrap()
    }

    /// Seed a user holding one subscription whose handshake already completed.
    pub async fn seed_verified_webhook(&self, gid: &str, secret: &str) -> WebhookId {
        let mut profile = user_profile();
        let webhook_id = WebhookId::new();
        profile
            .webhooks
            .put(webhook_id, WebhookRecordUpdate::resource_id(gid));
        profile
            .webhooks
            .put(webhook_id, WebhookRecordUpdate::secret(secret));
        self.store.save_user(&ctx(), &profile).await.unwrap();
        webhook_id
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

pub fn ctx() -> ConnectorContext {
    ConnectorContext::new(BASE_URL)
}

pub fn user_key() -> UserKey {
    UserKey::new(VendorUserId::new(USER_ID).unwrap())
}

pub fn vendor_user_key(vendor_id: &str) -> UserKey {
    UserKey::with_vendor(
        VendorId::new(vendor_id).unwrap(),
        VendorUserId::new(USER_ID).unwrap(),
    )
}

pub fn user_profile() -> UserProfile {
    let token = TokenContext::new(AccessToken::new(ACCESS_TOKEN), None);
    UserProfile::new(
        user_key(),
        VendorIdentity {
            gid: USER_ID.to_string(),
            name: Some("Test User".to_string()),
            email: Some("test@example.com".to_string()),
        },
    )
    .with_token(token)
}

// ============================================================================
// Request builders
// ============================================================================

pub fn webhook_path(webhook_id: &WebhookId) -> String {
    format!("/webhook/{}/{}", USER_ID, webhook_id)
}

pub fn handshake_request(path: &str, secret: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("X-Hook-Secret", secret)
        .body(Body::empty())
        .unwrap()
}

pub fn event_request(path: &str, signature: &str, body: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("X-Hook-Signature", signature)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_vec()))
        .unwrap()
}

pub fn signed_event_request(path: &str, secret: &str, body: &[u8]) -> Request<Body> {
    event_request(path, &SignatureVerifier::compute_signature(secret, body), body)
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub const TASK_CHANGED: &[u8] = br#"{"events":[{"action":"changed","user":{"gid":"1201","resource_type":"user"},"resource":{"gid":"1400","resource_type":"task"},"change":{"field":"custom_fields","action":"changed"}}]}"#;

// ============================================================================
// Asana handshake simulation
// ============================================================================

/// Responds to `POST /webhooks` the way Asana does: first POST the
/// `X-Hook-Secret` handshake to the requested target, then return the new
/// webhook.
///
/// The handshake is delivered straight into the connector's router, so the
/// stored secret comes from the real webhook route.
pub struct AsanaHandshake {
    pub router: Router,
    pub secret: String,
    pub gid: String,
}

impl Respond for AsanaHandshake {
    fn respond(&self, request: &MockRequest) -> ResponseTemplate {
        let body: serde_json::Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let target = body["data"]["target"].as_str().unwrap_or_default().to_string();
        let path = target.strip_prefix(BASE_URL).unwrap_or(&target).to_string();

        let handshake = self
            .router
            .clone()
            .oneshot(handshake_request(&path, &self.secret));
        let echoed = futures::executor::block_on(handshake)
            .ok()
            .and_then(|response| {
                response
                    .headers()
                    .get("x-hook-secret")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            });

        if echoed.as_deref() != Some(self.secret.as_str()) {
            return ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errors": [{ "message": "Could not complete activation handshake with target URL." }]
            }));
        }

        ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": {
                "gid": self.gid,
                "resource_type": "webhook",
                "active": true,
                "resource": body["data"]["resource"].as_str().map(|gid| serde_json::json!({ "gid": gid })),
                "target": target,
            }
        }))
    }
}
