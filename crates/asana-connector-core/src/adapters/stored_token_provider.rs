//! Token provider backed by the token stored on the user profile.

use crate::platform::{ConnectorContext, TokenProvider};
use crate::profile::UserProfile;
use asana_sdk::{TokenContext, TokenError};
use async_trait::async_trait;
use tracing::warn;

/// Hands out the profile's stored token as long as it has not expired.
///
/// Refreshing tokens is the platform's job; an expired token is reported as
/// [`TokenError::Expired`].
#[derive(Debug, Clone, Default)]
pub struct StoredTokenProvider;

impl StoredTokenProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn ensure_access_token(
        &self,
        _ctx: &ConnectorContext,
        profile: &UserProfile,
    ) -> Result<TokenContext, TokenError> {
        let token = profile.token.as_ref().ok_or(TokenError::Missing)?;

        if token.is_expired() {
            warn!(
                vendor_user_id = %profile.vendor_user_id,
                "Stored access token has expired"
            );
            return Err(TokenError::Expired);
        }

        Ok(token.clone())
    }
}

#[cfg(test)]
#[path = "stored_token_provider_tests.rs"]
mod tests;
