//! Error types for the HTTP service

use asana_connector_core::{ConnectorError, StorageError, ValidationError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

/// Errors returned by the management routes (`/me`, `/start`, `/stop`) and
/// the notification route.
///
/// Every variant renders as `{"status", "statusCode", "message"}`. Internal
/// details are logged server-side; the body carries a short description.
///
/// The vendor-facing webhook route does not use this type: Asana only ever
/// sees a status code and, for handshakes, the echoed secret header.
#[derive(Debug, thiserror::Error)]
pub enum ApiHandlerError {
    /// A path segment is not a valid identifier
    ///
    /// Maps to: `404 Not Found` (no such user can exist)
    #[error("Invalid path parameter: {0}")]
    InvalidPath(#[from] ValidationError),

    /// No profile is stored for the requested user
    ///
    /// Maps to: `404 Not Found`
    #[error("User not found: {key}")]
    UserNotFound { key: String },

    /// The notification body is not JSON
    ///
    /// Maps to: `400 Bad Request`
    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },

    /// Building the client or running the notification hook failed
    ///
    /// Maps to: `500 Internal Server Error`
    #[error("Error sending notification: {message}")]
    NotificationFailed { message: String },

    /// Reading or writing the user store failed
    ///
    /// Maps to: `503 Service Unavailable`
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),

    /// A connector operation failed
    ///
    /// Maps to: `500 Internal Server Error`, except the fail-closed
    /// verification errors (`410 Gone`) and a missing profile (`404`).
    #[error("{0}")]
    Connector(#[from] ConnectorError),
}

impl ApiHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPath(_) | Self::UserNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            Self::NotificationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Connector(e) => match e {
                ConnectorError::ProfileNotFound { .. } => StatusCode::NOT_FOUND,
                ConnectorError::WebhookUnknown { .. } | ConnectorError::SignatureInvalid { .. } => {
                    StatusCode::GONE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::InvalidPath(e) => {
                warn!(error = %e, "Invalid path parameter");
                "Not found".to_string()
            }
            Self::UserNotFound { key } => {
                warn!(user = %key, "User not found");
                "Not found".to_string()
            }
            Self::InvalidBody { message } => {
                warn!(error = %message, "Rejected notification body");
                self.to_string()
            }
            Self::NotificationFailed { message } => {
                error!(error = %message, "Notification failed");
                self.to_string()
            }
            Self::Storage(e) => {
                error!(error = %e, "User store unavailable");
                "Storage unavailable".to_string()
            }
            Self::Connector(e) if status.is_server_error() => {
                error!(error = %e, "Connector operation failed");
                e.to_string()
            }
            Self::Connector(e) => {
                warn!(error = %e, "Connector operation rejected");
                e.to_string()
            }
        };

        let body = serde_json::json!({
            "status": status.as_u16(),
            "statusCode": status.as_u16(),
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to initialise {component}: {message}")]
    Initialization { component: String, message: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}
