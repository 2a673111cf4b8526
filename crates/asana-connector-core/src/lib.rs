//! # Asana Connector Core
//!
//! Core logic for the Asana connector: per-user webhook bookkeeping, the webhook
//! subscription lifecycle, inbound webhook dispatch and connectivity health.
//!
//! ## Architecture
//!
//! Everything the hosting platform owns is reached through traits in
//! [`platform`]: user storage, OAuth token access, construction of vendor
//! clients, the application's event handler and the self-relay transport.
//! Implementations are injected at runtime; [`adapters`] ships in-memory and
//! filesystem ones.
//!
//! - [`registry`] - the per-profile map of webhook records
//! - [`lifecycle`] - create/delete subscriptions against the Asana API
//! - [`dispatcher`] - handshake/verify/dispatch state machine
//! - [`health`] - profile normalization and connectivity checks
//!
//! ## Usage
//!
//! ```rust
//! use asana_connector_core::{UserKey, VendorUserId, WebhookId};
//!
//! let key = UserKey::new(VendorUserId::new("1201").unwrap());
//! let webhook_id = WebhookId::new();
//! assert_eq!(key.storage_key(), "1201");
//! assert!(!webhook_id.to_string().is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod adapters;
pub mod dispatcher;
pub mod health;
pub mod lifecycle;
pub mod platform;
pub mod profile;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use asana_sdk::{ApiError, TokenError};
pub use uuid::Uuid;

pub use dispatcher::{DispatchOutcome, EventDispatcher, InboundWebhook, RejectReason, RelayPolicy};
pub use health::{HealthReport, ProfileAdapter};
pub use lifecycle::{CreatedWebhook, WebhookLifecycleManager};
pub use platform::{
    ConnectorContext, HandlerError, NotificationResponse, NotificationSender, RelayError,
    SelfRelay, TokenProvider, UserStore, VendorClientFactory, WebhookEventHandler,
};
pub use profile::{UserKey, UserProfile, VendorIdentity};
pub use registry::{WebhookRecord, WebhookRecordUpdate, WebhookRegistry};

/// Standard result type for connector operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

// ============================================================================
// Domain Identifier Types
// ============================================================================

const MAX_IDENTIFIER_LENGTH: usize = 256;

fn validate_identifier(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: MAX_IDENTIFIER_LENGTH,
        });
    }

    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidCharacters {
            field: field.to_string(),
            invalid_chars: "whitespace or control characters".to_string(),
        });
    }

    Ok(())
}

/// Asana user identifier (the user's gid) that owns a profile.
///
/// Appears as a path segment in callback URLs, so it must be non-empty and
/// free of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VendorUserId(String);

impl VendorUserId {
    /// Create a vendor user ID with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_identifier("vendor_user_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VendorUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VendorUserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for VendorUserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VendorUserId> for String {
    fn from(value: VendorUserId) -> Self {
        value.0
    }
}

/// Optional secondary identifier scoping a user (for example a workspace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VendorId(String);

impl VendorId {
    /// Create a vendor ID with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_identifier("vendor_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VendorId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for VendorId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VendorId> for String {
    fn from(value: VendorId) -> Self {
        value.0
    }
}

/// Locally generated identifier correlating a callback URL with a webhook record.
///
/// Random UUID v4; never derived from anything Asana assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebhookId(Uuid);

impl WebhookId {
    /// Generate a new random webhook ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WebhookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WebhookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WebhookId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s).map_err(|e| ValidationError::InvalidFormat {
            field: "webhook_id".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self(uuid))
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    TooLong { field: String, max_length: usize },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

/// Failures of the platform's user store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read user '{key}': {message}")]
    ReadFailed { key: String, message: String },

    #[error("Failed to write user '{key}': {message}")]
    WriteFailed { key: String, message: String },

    #[error("Stored user '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },
}

/// Connector error taxonomy.
///
/// How each variant reaches the vendor or the caller is decided at the HTTP
/// edge: verification failures become 410, registration and vendor failures
/// propagate to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// No user profile could be resolved for the request.
    #[error("User profile not found: {key}")]
    ProfileNotFound { key: String },

    /// The webhook has no stored secret (unknown or still pending).
    #[error("Unknown webhook {webhook_id}")]
    WebhookUnknown { webhook_id: WebhookId },

    /// The event signature did not match the stored secret.
    #[error("Invalid signature for webhook {webhook_id}")]
    SignatureInvalid { webhook_id: WebhookId },

    /// The handshake never completed while creating a subscription.
    #[error("Webhook registration failed for user {vendor_user_id}, webhook {webhook_id}")]
    WebhookRegistrationFailed {
        vendor_user_id: VendorUserId,
        webhook_id: WebhookId,
    },

    #[error("Asana API error: {0}")]
    VendorApi(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The application event handler failed.
    #[error("Event handler failed: {0}")]
    Handler(String),
}

impl ConnectorError {
    /// Check if this error represents a transient condition that may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::VendorApi(e) => e.is_transient(),
            Self::Storage(StorageError::ReadFailed { .. })
            | Self::Storage(StorageError::WriteFailed { .. }) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
