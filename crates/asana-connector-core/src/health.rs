//! # Health and Profile Adapter
//!
//! Connectivity checks against Asana on behalf of a user and normalization of
//! OAuth token exchanges into [`UserProfile`]s.

use crate::platform::{ConnectorContext, UserStore, VendorClientFactory};
use crate::profile::{UserKey, UserProfile, VendorIdentity};
use crate::{ConnectorError, ConnectorResult, VendorId, VendorUserId};
use asana_sdk::{ApiError, TokenContext, TokenError};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Status and JSON body to return from a health check.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub status: u16,
    pub body: Value,
}

impl HealthReport {
    fn failure(status: u16, error_code: &str, message: String) -> Self {
        Self {
            status,
            body: json!({
                "errorCode": error_code,
                "status": status,
                "statusCode": status,
                "message": message,
            }),
        }
    }

    fn from_api_error(error: &ApiError) -> Self {
        Self::failure(
            error.status_code(),
            error.error_code().unwrap_or("unknown"),
            error.message(),
        )
    }

    pub fn is_healthy(&self) -> bool {
        self.status == 200
    }
}

/// Builds profiles from token exchanges and reports per-user connectivity.
pub struct ProfileAdapter {
    store: Arc<dyn UserStore>,
    clients: Arc<dyn VendorClientFactory>,
}

impl ProfileAdapter {
    pub fn new(store: Arc<dyn UserStore>, clients: Arc<dyn VendorClientFactory>) -> Self {
        Self { store, clients }
    }

    /// Confirm the user's token works by asking Asana who it belongs to.
    ///
    /// Vendor failures are reported in the body with Asana's status, code and
    /// message; they are never retried.
    #[instrument(
        skip(self, ctx, profile),
        fields(request_id = %ctx.request_id, vendor_user_id = %profile.vendor_user_id)
    )]
    pub async fn get_health(&self, ctx: &ConnectorContext, profile: &UserProfile) -> HealthReport {
        let client = match self.clients.create_client(ctx, profile).await {
            Ok(client) => client,
            Err(ConnectorError::Token(e)) => {
                warn!(error = %e, "Health check has no usable token");
                return HealthReport::failure(401, "token_unavailable", e.to_string());
            }
            Err(ConnectorError::VendorApi(e)) => {
                warn!(error = %e, "Failed to create Asana client");
                return HealthReport::from_api_error(&e);
            }
            Err(e) => {
                warn!(error = %e, "Failed to create Asana client");
                return HealthReport::failure(500, "internal_error", e.to_string());
            }
        };

        match client.get_identity().await {
            Ok(user) => HealthReport {
                status: 200,
                body: json!({
                    "identity": user,
                    "webhookCount": profile.webhooks.len(),
                }),
            },
            Err(e) => {
                warn!(
                    error = %e,
                    status = e.status_code(),
                    "Asana identity check failed"
                );
                HealthReport::from_api_error(&e)
            }
        }
    }

    /// Normalize a token into a profile with an empty webhook registry.
    ///
    /// # Errors
    ///
    /// Fails if the token does not identify an Asana user.
    pub fn get_user_profile(
        vendor_id: Option<VendorId>,
        token: TokenContext,
    ) -> ConnectorResult<UserProfile> {
        let user_id = token.data.user_id().ok_or(TokenError::MissingField {
            field: "data.gid".to_string(),
        })?;
        let vendor_user_id = VendorUserId::new(user_id)?;

        let key = match vendor_id {
            Some(vendor_id) => UserKey::with_vendor(vendor_id, vendor_user_id),
            None => UserKey::new(vendor_user_id),
        };
        let identity = VendorIdentity::from(&token.data);

        Ok(UserProfile::new(key, identity).with_token(token))
    }

    /// Complete onboarding: store the profile for a freshly exchanged token.
    ///
    /// Re-authorizing an existing user replaces the token and identity but
    /// keeps the user's webhooks.
    #[instrument(skip(self, ctx, token), fields(request_id = %ctx.request_id))]
    pub async fn register_user(
        &self,
        ctx: &ConnectorContext,
        vendor_id: Option<VendorId>,
        token: TokenContext,
    ) -> ConnectorResult<UserProfile> {
        let mut profile = Self::get_user_profile(vendor_id, token)?;

        if let Some(existing) = self.store.get_user(ctx, &profile.key()).await? {
            profile.webhooks = existing.webhooks;
        }

        self.store.save_user(ctx, &profile).await?;

        info!(
            vendor_user_id = %profile.vendor_user_id,
            webhook_count = profile.webhooks.len(),
            "User registered"
        );
        Ok(profile)
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
