//! Error types for Asana SDK operations.
//!
//! This module defines the error types used throughout the SDK. API errors keep
//! the vendor's status code, error code and message intact so that callers can
//! pass them through to operators verbatim.

use thiserror::Error;

/// Errors during Asana API operations.
///
/// These errors represent failures when communicating with the Asana REST API,
/// including HTTP error responses, timeouts and parsing failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP error response from the Asana API.
    ///
    /// `code` carries the vendor's machine readable error code when one was
    /// supplied (for example `not_authorized` or `invalid_request`).
    #[error("HTTP error: {status} - {message}")]
    HttpError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Request to the Asana API timed out.
    #[error("Request timeout")]
    Timeout,

    /// The request was invalid before it was sent (bad URL, bad input).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Authentication to the Asana API failed (401).
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The requested resource was not found (404).
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Failed to parse a JSON response from the Asana API.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP client error (network, TLS, etc.).
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

impl ApiError {
    /// HTTP status reported by the vendor, or 500 when there was none.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::HttpError { status, .. } => *status,
            Self::AuthenticationFailed { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Timeout => 504,
            Self::HttpClientError(e) => e.status().map(|s| s.as_u16()).unwrap_or(500),
            Self::InvalidRequest { .. } | Self::JsonError(_) => 500,
        }
    }

    /// Vendor error code, when one is known.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::HttpError { code, .. } => code.as_deref(),
            Self::AuthenticationFailed { .. } => Some("not_authorized"),
            Self::NotFound { .. } => Some("not_found"),
            Self::Timeout => Some("timeout"),
            _ => None,
        }
    }

    /// The vendor's own message, without the variant prefix `Display` adds.
    pub fn message(&self) -> String {
        match self {
            Self::HttpError { message, .. }
            | Self::InvalidRequest { message }
            | Self::AuthenticationFailed { message }
            | Self::NotFound { message } => message.clone(),
            Self::Timeout => "Request timeout".to_string(),
            Self::JsonError(e) => e.to_string(),
            Self::HttpClientError(e) => e.to_string(),
        }
    }

    /// Check if this error represents a transient condition that may succeed if retried.
    ///
    /// The connector never retries inline; this is reported so callers and
    /// logs can tell transient from permanent failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout => true,
            Self::InvalidRequest { .. } => false,
            Self::AuthenticationFailed { .. } => false,
            Self::NotFound { .. } => false,
            Self::JsonError(_) => false,
            Self::HttpClientError(_) => true,
        }
    }
}

/// Errors in OAuth token material.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No token is stored for the user.
    #[error("No access token available")]
    Missing,

    /// The stored access token has expired and cannot be used.
    #[error("Access token expired")]
    Expired,

    /// The token exchange response is missing a required field.
    #[error("Token response missing field: {field}")]
    MissingField { field: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
