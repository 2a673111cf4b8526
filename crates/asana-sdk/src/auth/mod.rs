//! Asana OAuth token types.
//!
//! Token acquisition and refresh are owned by the hosting platform. This module
//! only models the token material the connector consumes:
//! - [`AccessToken`] - bearer credential with redacted debug output
//! - [`TokenExchangeResponse`] - the raw body of Asana's OAuth token exchange
//! - [`TokenContext`] - the stored, normalized form with an absolute expiry

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

// ============================================================================
// Access Token
// ============================================================================

/// OAuth bearer token used to authenticate Asana API calls.
///
/// # Examples
///
/// ```
/// use asana_sdk::auth::AccessToken;
///
/// let token = AccessToken::new("0/abc123");
/// assert_eq!(token.as_str(), "0/abc123");
/// assert_eq!(format!("{:?}", token), "AccessToken(<REDACTED>)");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token value for use in an `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Security: Don't expose tokens in debug output
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<REDACTED>)")
    }
}

// ============================================================================
// Token Exchange
// ============================================================================

/// The user block Asana returns alongside an OAuth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUser {
    /// Legacy numeric identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Global identifier (string form).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TokenUser {
    /// The vendor user identifier, preferring `gid` over the legacy numeric `id`.
    pub fn user_id(&self) -> Option<String> {
        self.gid
            .clone()
            .filter(|gid| !gid.is_empty())
            .or_else(|| self.id.map(|id| id.to_string()))
    }
}

/// Raw response body of the Asana OAuth token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: AccessToken,

    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,

    #[serde(default)]
    pub refresh_token: Option<AccessToken>,

    #[serde(default)]
    pub data: Option<TokenUser>,
}

// ============================================================================
// Token Context
// ============================================================================

/// Stored token material for one Asana user.
///
/// # Examples
///
/// ```
/// use asana_sdk::auth::{AccessToken, TokenContext};
/// use chrono::{Duration, Utc};
///
/// let context = TokenContext::new(AccessToken::new("token"), Some(Utc::now() + Duration::hours(1)));
/// assert!(!context.is_expired());
/// assert!(context.expires_soon(Duration::hours(2)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContext {
    pub access_token: AccessToken,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<AccessToken>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub data: TokenUser,
}

impl TokenContext {
    /// Create a token context with no refresh token or user data.
    pub fn new(access_token: AccessToken, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at,
            data: TokenUser::default(),
        }
    }

    /// Normalize a token exchange response received at `received_at`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MissingField` if the response does not identify a user.
    pub fn from_exchange(
        response: TokenExchangeResponse,
        received_at: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        let data = response.data.unwrap_or_default();
        if data.user_id().is_none() {
            return Err(TokenError::MissingField {
                field: "data.gid".to_string(),
            });
        }

        Ok(Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: response
                .expires_in
                .map(|seconds| received_at + Duration::seconds(seconds)),
            data,
        })
    }

    /// Check whether the access token has expired.
    ///
    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Utc::now() >= expires_at)
            .unwrap_or(false)
    }

    /// Check whether the access token expires within `margin`.
    pub fn expires_soon(&self, margin: Duration) -> bool {
        self.expires_at
            .map(|expires_at| Utc::now() + margin >= expires_at)
            .unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
