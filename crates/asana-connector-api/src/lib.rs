//! # Asana Connector HTTP Service
//!
//! HTTP surface of the Asana connector. Asana posts handshakes and event
//! deliveries to the webhook routes; operators use the per-user management
//! routes to check connectivity and to create or remove subscriptions.
//!
//! This crate provides:
//! - Webhook callback routes with handshake, signature verification and
//!   optional self-relay
//! - Per-user `/me`, `/start` and `/stop` management routes
//! - A per-user notification route backed by an application hook
//! - A liveness probe
//! - Service configuration and server start-up with graceful shutdown

pub mod config;
pub mod errors;
pub mod relay;

pub use config::{
    AsanaConfig, ConnectorConfig, LoggingConfig, OnboardingConfig, RelayConfig, ServerConfig,
    ServiceConfig, StorageConfig,
};
pub use errors::{ApiHandlerError, ConfigError, ServiceError};
pub use relay::HttpSelfRelay;

use asana_connector_core::adapters::LoggingNotificationSender;
use asana_connector_core::{
    ConnectorContext, EventDispatcher, InboundWebhook, NotificationSender, ProfileAdapter,
    SelfRelay, UserKey, UserProfile, UserStore, VendorClientFactory, VendorId, VendorUserId,
    WebhookEventHandler, WebhookId, WebhookLifecycleManager,
};
use axum::{
    extract::{DefaultBodyLimit, Path, RawQuery, State},
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use std::{collections::HashMap, future::IntoFuture, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

/// `X-Hook-Secret`, echoed back on a handshake response.
const HOOK_SECRET: HeaderName = HeaderName::from_static("x-hook-secret");

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// User profile persistence
    pub store: Arc<dyn UserStore>,

    /// Builds authenticated Asana clients for a user
    pub clients: Arc<dyn VendorClientFactory>,

    /// Handshake, verification and event dispatch
    pub dispatcher: Arc<EventDispatcher>,

    /// Webhook subscription create/delete
    pub lifecycle: Arc<WebhookLifecycleManager>,

    /// Connectivity checks and profile onboarding
    pub profiles: Arc<ProfileAdapter>,

    /// Application hook behind the notification route
    pub notifications: Arc<dyn NotificationSender>,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// When `connector.relay.enabled` is set an [`HttpSelfRelay`] posting back
    /// to `connector.base_url` is installed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Initialization` if the relay HTTP client cannot
    /// be built.
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn UserStore>,
        clients: Arc<dyn VendorClientFactory>,
        handler: Arc<dyn WebhookEventHandler>,
    ) -> Result<Self, ServiceError> {
        let relay: Option<Arc<dyn SelfRelay>> = if config.connector.relay.enabled {
            let relay = HttpSelfRelay::new(
                config.connector.relay.marker.clone(),
                Duration::from_secs(config.asana.timeout_seconds),
            )
            .map_err(|e| ServiceError::Initialization {
                component: "self-relay".to_string(),
                message: e.to_string(),
            })?;
            Some(Arc::new(relay))
        } else {
            None
        };

        Ok(Self::with_self_relay(config, store, clients, handler, relay))
    }

    /// Create application state with an explicit relay transport.
    ///
    /// `relay` is ignored unless `connector.relay.enabled` is set.
    pub fn with_self_relay(
        config: ServiceConfig,
        store: Arc<dyn UserStore>,
        clients: Arc<dyn VendorClientFactory>,
        handler: Arc<dyn WebhookEventHandler>,
        relay: Option<Arc<dyn SelfRelay>>,
    ) -> Self {
        let mut dispatcher = EventDispatcher::new(store.clone(), handler);
        if let (true, Some(relay)) = (config.connector.relay.enabled, relay) {
            dispatcher = dispatcher.with_relay(relay, config.connector.relay.delay());
        }

        Self {
            lifecycle: Arc::new(WebhookLifecycleManager::new(store.clone())),
            profiles: Arc::new(ProfileAdapter::new(store.clone(), clients.clone())),
            dispatcher: Arc::new(dispatcher),
            notifications: Arc::new(LoggingNotificationSender::new()),
            config: Arc::new(config),
            store,
            clients,
        }
    }

    /// Replace the default notification hook, which only logs.
    pub fn with_notification_sender(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.notifications = sender;
        self
    }

    /// Fresh per-request context.
    pub fn context(&self) -> ConnectorContext {
        ConnectorContext::new(self.config.connector.base_url.clone())
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Connector routes, without state or middleware, for a host router to merge.
///
/// Every per-user route takes either `/{vendor_user_id}` or
/// `/{vendor_id}/{vendor_user_id}`. Parameters are positional, so sibling
/// routes share the names `id1`, `id2` and `id3`.
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/webhook/{id1}/{id2}", post(handle_user_webhook))
        .route("/webhook/{id1}/{id2}/{id3}", post(handle_vendor_user_webhook))
        .route("/notification/{id1}", post(handle_notification))
        .route("/notification/{id1}/{id2}", post(handle_notification))
        .route("/{id1}/me", get(handle_me))
        .route("/{id1}/{id2}/me", get(handle_me))
        .route("/{id1}/start", get(handle_start))
        .route("/{id1}/{id2}/start", get(handle_start))
        .route("/{id1}/stop", get(handle_stop))
        .route("/{id1}/{id2}/stop", get(handle_stop))
}

/// Create the HTTP router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .route("/health", get(handle_health_check))
        .merge(webhook_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body_size))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Runs until SIGINT or SIGTERM. In-flight requests are given
/// `server.shutdown_timeout_seconds` to finish.
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let shutdown_timeout = Duration::from_secs(state.config.server.shutdown_timeout_seconds);

    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.clone(),
                message: e.to_string(),
            })?;

    info!(
        address = %addr,
        base_url = %state.config.connector.base_url,
        relay_enabled = state.dispatcher.relay_enabled(),
        "Starting HTTP server"
    );

    let app = create_router(state);
    let shutdown_started = Arc::new(tokio::sync::Notify::new());

    let server = axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown_started = shutdown_started.clone();
            async move {
                shutdown_signal().await;
                info!(
                    timeout_seconds = shutdown_timeout.as_secs(),
                    "Initiating graceful shutdown"
                );
                shutdown_started.notify_one();
            }
        })
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = async {
            shutdown_started.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!("Graceful shutdown timed out, dropping in-flight requests");
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// `POST /webhook/{vendor_user_id}/{webhook_id}`
async fn handle_user_webhook(
    State(state): State<AppState>,
    Path((vendor_user_id, webhook_id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = match VendorUserId::new(vendor_user_id) {
        Ok(user) => UserKey::new(user),
        Err(e) => {
            warn!(error = %e, "Webhook delivery for invalid user id");
            return StatusCode::GONE.into_response();
        }
    };

    handle_webhook(state, key, &webhook_id, query, headers, body).await
}

/// `POST /webhook/{vendor_id}/{vendor_user_id}/{webhook_id}`
async fn handle_vendor_user_webhook(
    State(state): State<AppState>,
    Path((vendor_id, vendor_user_id, webhook_id)): Path<(String, String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = match (VendorId::new(vendor_id), VendorUserId::new(vendor_user_id)) {
        (Ok(vendor), Ok(user)) => UserKey::with_vendor(vendor, user),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Webhook delivery for invalid user id");
            return StatusCode::GONE.into_response();
        }
    };

    handle_webhook(state, key, &webhook_id, query, headers, body).await
}

/// Handle an Asana handshake or event delivery
///
/// Asana only sees a status code: 200 for an accepted handshake or event
/// (with `X-Hook-Secret` echoed on a handshake) and 410 for anything that
/// cannot be tied to a known, verified subscription. A 410 tells Asana to
/// stop delivering to this target. A failing user store yields a bare 500
/// so Asana retries instead of disabling the subscription.
#[instrument(
    skip_all,
    fields(user = %key, webhook_id = %webhook_id, body_size = body.len())
)]
async fn handle_webhook(
    state: AppState,
    key: UserKey,
    webhook_id: &str,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let webhook_id: WebhookId = match webhook_id.parse() {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Webhook delivery with malformed webhook id");
            return StatusCode::GONE.into_response();
        }
    };

    let ctx = state.context();
    // Last value wins, matching how the dispatcher sees repeated headers
    let echoed_secret = headers.get_all(HOOK_SECRET).iter().last().cloned();
    let relayed = has_marker(query.as_deref(), &state.config.connector.relay.marker);

    let profile = match state.store.get_user(&ctx, &key).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(error = %e, "Failed to load user profile for webhook delivery");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let request = InboundWebhook::new(key, webhook_id, body)
        .with_headers(header_map(&headers))
        .relayed(relayed);

    let outcome = match state.dispatcher.dispatch(&ctx, profile, request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Webhook dispatch failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = status.into_response();

    // A stored handshake secret came from this request's header, so echo it verbatim
    if let (Some(_), Some(value)) = (outcome.hook_secret(), echoed_secret) {
        response.headers_mut().insert(HOOK_SECRET, value);
    }

    response
}

/// Whether the query string carries the self-relay marker flag.
fn has_marker(query: Option<&str>, marker: &str) -> bool {
    query.is_some_and(|query| {
        query
            .split('&')
            .any(|pair| pair.split('=').next() == Some(marker))
    })
}

/// Lowercased header names; values that are not visible ASCII are dropped.
fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_lowercase(), value.to_string()))
        })
        .collect()
}

// ============================================================================
// Management Handlers
// ============================================================================

/// `GET /[{vendor_id}/]{vendor_user_id}/me`: Asana connectivity check for one user
#[instrument(skip(state))]
async fn handle_me(
    State(state): State<AppState>,
    Path(segments): Path<Vec<String>>,
) -> Result<Response, ApiHandlerError> {
    let ctx = state.context();
    let profile = lookup_user(&state, &ctx, &segments).await?;

    let report = state.profiles.get_health(&ctx, &profile).await;
    let status = StatusCode::from_u16(report.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    Ok((status, Json(report.body)).into_response())
}

/// `GET /[{vendor_id}/]{vendor_user_id}/start`: subscribe to the configured example resource
#[instrument(skip(state))]
async fn handle_start(
    State(state): State<AppState>,
    Path(segments): Path<Vec<String>>,
) -> Result<Response, ApiHandlerError> {
    let ctx = state.context();
    let profile = lookup_user(&state, &ctx, &segments).await?;

    let onboarding = &state.config.connector.onboarding;
    let client = state.clients.create_client(&ctx, &profile).await?;
    let created = state
        .lifecycle
        .create_webhook(
            &ctx,
            &profile,
            client.as_ref(),
            &onboarding.example_resource_id,
            &onboarding.filter_options(),
        )
        .await?;

    info!(webhook_id = %created.webhook_id, "Example webhook created");
    Ok(Json(json!({ "webhookId": created.webhook_id })).into_response())
}

/// `GET /[{vendor_id}/]{vendor_user_id}/stop`: remove every subscription the user holds
#[instrument(skip(state))]
async fn handle_stop(
    State(state): State<AppState>,
    Path(segments): Path<Vec<String>>,
) -> Result<Response, ApiHandlerError> {
    let ctx = state.context();
    let mut profile = lookup_user(&state, &ctx, &segments).await?;

    let client = state.clients.create_client(&ctx, &profile).await?;
    state
        .lifecycle
        .delete_all_webhooks(&ctx, &mut profile, client.as_ref())
        .await?;

    Ok(StatusCode::OK.into_response())
}

/// `POST /notification/[{vendor_id}/]{vendor_user_id}`: run the application's
/// notification hook with an authenticated client for the user
#[instrument(skip(state, body), fields(body_size = body.len()))]
async fn handle_notification(
    State(state): State<AppState>,
    Path(segments): Path<Vec<String>>,
    body: Bytes,
) -> Result<Response, ApiHandlerError> {
    let ctx = state.context();
    let profile = lookup_user(&state, &ctx, &segments).await?;

    let payload: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiHandlerError::InvalidBody {
            message: e.to_string(),
        })?
    };

    let client = state
        .clients
        .create_client(&ctx, &profile)
        .await
        .map_err(|e| ApiHandlerError::NotificationFailed {
            message: e.to_string(),
        })?;

    let response = state
        .notifications
        .send_notification(&ctx, &profile, client.as_ref(), &payload)
        .await
        .map_err(|e| ApiHandlerError::NotificationFailed {
            message: e.to_string(),
        })?;

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(match response.body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    })
}

/// Resolve the user addressed by the path segments.
///
/// One segment is the vendor user id; two are the vendor id then the vendor
/// user id.
fn user_key(segments: &[String]) -> Result<UserKey, ApiHandlerError> {
    match segments {
        [vendor_user_id] => Ok(UserKey::new(VendorUserId::new(vendor_user_id.as_str())?)),
        [vendor_id, vendor_user_id] => Ok(UserKey::with_vendor(
            VendorId::new(vendor_id.as_str())?,
            VendorUserId::new(vendor_user_id.as_str())?,
        )),
        _ => Err(ApiHandlerError::UserNotFound {
            key: segments.join("/"),
        }),
    }
}

/// Load the profile for a per-user route, mapping absence to 404.
async fn lookup_user(
    state: &AppState,
    ctx: &ConnectorContext,
    segments: &[String],
) -> Result<UserProfile, ApiHandlerError> {
    let key = user_key(segments)?;

    state
        .store
        .get_user(ctx, &key)
        .await?
        .ok_or_else(|| ApiHandlerError::UserNotFound {
            key: key.to_string(),
        })
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Liveness probe
async fn handle_health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
