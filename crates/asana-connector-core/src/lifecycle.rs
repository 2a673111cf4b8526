//! # Webhook Lifecycle
//!
//! Creating and deleting Asana webhook subscriptions for a user.
//!
//! Creating a subscription makes Asana call the target URL with the handshake
//! before `POST /webhooks` returns, so the handshake and the creation race.
//! [`WebhookLifecycleManager::create_webhook`] resolves that by reloading the
//! profile from the store after the vendor call and trusting only what was
//! persisted there.

use crate::platform::{ConnectorContext, UserStore};
use crate::profile::{UserKey, UserProfile};
use crate::registry::{WebhookRecord, WebhookRecordUpdate};
use crate::{ConnectorError, ConnectorResult, WebhookId};
use asana_sdk::client::{CreateWebhookRequest, WebhookFilterOptions};
use asana_sdk::AsanaApi;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Result of a successful [`WebhookLifecycleManager::create_webhook`].
#[derive(Debug, Clone)]
pub struct CreatedWebhook {
    pub webhook_id: WebhookId,

    /// The reloaded profile including the completed record. Already persisted.
    pub profile: UserProfile,
}

/// Creates and deletes webhook subscriptions, keeping the profile's registry
/// and the user store in step with the vendor.
pub struct WebhookLifecycleManager {
    store: Arc<dyn UserStore>,
}

impl WebhookLifecycleManager {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Callback URL Asana delivers the handshake and events for `webhook_id` to.
    pub fn callback_url(base_url: &str, key: &UserKey, webhook_id: &WebhookId) -> String {
        let base_url = base_url.trim_end_matches('/');
        let user = urlencoding::encode(key.vendor_user_id.as_str());
        match &key.vendor_id {
            Some(vendor_id) => format!(
                "{}/webhook/{}/{}/{}",
                base_url,
                urlencoding::encode(vendor_id.as_str()),
                user,
                webhook_id
            ),
            None => format!("{}/webhook/{}/{}", base_url, user, webhook_id),
        }
    }

    /// Subscribe to `resource_id` and wait for the handshake to have landed.
    ///
    /// On success the returned profile has been saved with both the vendor
    /// webhook gid and the handshake secret for the new webhook.
    ///
    /// # Errors
    ///
    /// - `ConnectorError::VendorApi` if Asana refuses the subscription
    /// - `ConnectorError::WebhookRegistrationFailed` if no handshake secret was
    ///   persisted; the vendor subscription is deleted again before returning
    /// - `ConnectorError::Storage` if the store cannot be read or written; the
    ///   vendor subscription is deleted again on a best-effort basis
    #[instrument(
        skip(self, ctx, profile, client, options),
        fields(
            request_id = %ctx.request_id,
            vendor_user_id = %profile.vendor_user_id,
            webhook_id = tracing::field::Empty,
        )
    )]
    pub async fn create_webhook(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
        client: &dyn AsanaApi,
        resource_id: &str,
        options: &WebhookFilterOptions,
    ) -> ConnectorResult<CreatedWebhook> {
        let webhook_id = WebhookId::new();
        tracing::Span::current().record("webhook_id", tracing::field::display(&webhook_id));

        let key = profile.key();
        let target = Self::callback_url(&ctx.base_url, &key, &webhook_id);
        debug!(target = %target, resource_id = %resource_id, "Creating webhook subscription");

        let request = CreateWebhookRequest::new(resource_id, target, options);
        let webhook = client.create_webhook(&request).await?;

        match self
            .complete_registration(ctx, profile, &key, client, webhook_id, &webhook.gid)
            .await
        {
            Ok(created) => {
                info!(webhook_gid = %webhook.gid, "Webhook subscription created");
                Ok(created)
            }
            Err(e @ ConnectorError::Storage(_)) => {
                // The subscription exists on Asana but no record carries its gid
                error!(
                    webhook_gid = %webhook.gid,
                    error = %e,
                    "User store failed after webhook creation, removing subscription"
                );
                if let Err(delete_error) = client.delete_webhook(&webhook.gid).await {
                    error!(
                        webhook_gid = %webhook.gid,
                        error = %delete_error,
                        "Failed to remove subscription after store failure"
                    );
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Reconcile the freshly created subscription with what the handshake persisted.
    async fn complete_registration(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
        key: &UserKey,
        client: &dyn AsanaApi,
        webhook_id: WebhookId,
        webhook_gid: &str,
    ) -> ConnectorResult<CreatedWebhook> {
        // The handshake may have saved a newer copy while the call was in flight
        let mut current = match self.store.get_user(ctx, key).await? {
            Some(current) => current,
            None => {
                warn!("Profile disappeared while creating webhook, using caller's copy");
                profile.clone()
            }
        };

        let handshake_completed = current
            .webhooks
            .get(&webhook_id)
            .map(|record| !record.is_pending())
            .unwrap_or(false);

        current
            .webhooks
            .put(webhook_id, WebhookRecordUpdate::resource_id(webhook_gid));

        if !handshake_completed {
            warn!(
                webhook_gid = %webhook_gid,
                "Webhook handshake did not complete, removing subscription"
            );
            if let Err(e) = self
                .delete_webhook(ctx, &mut current, client, &webhook_id, true)
                .await
            {
                error!(
                    webhook_gid = %webhook_gid,
                    error = %e,
                    "Failed to remove subscription after incomplete handshake"
                );
            }

            return Err(ConnectorError::WebhookRegistrationFailed {
                vendor_user_id: profile.vendor_user_id.clone(),
                webhook_id,
            });
        }

        self.store.save_user(ctx, &current).await?;

        Ok(CreatedWebhook {
            webhook_id,
            profile: current,
        })
    }

    /// Delete one subscription.
    ///
    /// Does nothing if the profile has no record for `webhook_id`. Vendor
    /// failures are returned and leave the record in place.
    #[instrument(
        skip(self, ctx, profile, client),
        fields(request_id = %ctx.request_id, vendor_user_id = %profile.vendor_user_id)
    )]
    pub async fn delete_webhook(
        &self,
        ctx: &ConnectorContext,
        profile: &mut UserProfile,
        client: &dyn AsanaApi,
        webhook_id: &WebhookId,
        persist: bool,
    ) -> ConnectorResult<()> {
        let Some(record) = profile.webhooks.get(webhook_id) else {
            debug!("No webhook record to delete");
            return Ok(());
        };

        delete_remote(client, webhook_id, record).await?;
        profile.webhooks.remove(webhook_id);

        if persist {
            self.store.save_user(ctx, profile).await?;
        }

        info!("Webhook deleted");
        Ok(())
    }

    /// Delete every subscription the profile holds.
    ///
    /// Vendor deletions run concurrently and their failures are only logged.
    /// The registry is cleared and the profile saved once all attempts have
    /// finished, whether or not the vendor side succeeded.
    ///
    /// # Errors
    ///
    /// Only a failure of the final save is returned.
    #[instrument(
        skip(self, ctx, profile, client),
        fields(
            request_id = %ctx.request_id,
            vendor_user_id = %profile.vendor_user_id,
            webhook_count = profile.webhooks.len(),
        )
    )]
    pub async fn delete_all_webhooks(
        &self,
        ctx: &ConnectorContext,
        profile: &mut UserProfile,
        client: &dyn AsanaApi,
    ) -> ConnectorResult<()> {
        let deletions = profile
            .webhooks
            .iter()
            .map(|(webhook_id, record)| async move {
                if let Err(e) = delete_remote(client, webhook_id, record).await {
                    warn!(
                        webhook_id = %webhook_id,
                        error = %e,
                        "Failed to delete webhook subscription, dropping local record anyway"
                    );
                }
            });
        join_all(deletions).await;

        profile.webhooks.clear();
        self.store.save_user(ctx, profile).await?;

        info!("All webhooks deleted");
        Ok(())
    }
}

/// Delete the vendor side of a record. Records without a gid have nothing to delete.
async fn delete_remote(
    client: &dyn AsanaApi,
    webhook_id: &WebhookId,
    record: &WebhookRecord,
) -> ConnectorResult<()> {
    match record.resource_id() {
        Some(gid) => {
            client.delete_webhook(gid).await?;
            debug!(webhook_id = %webhook_id, webhook_gid = %gid, "Vendor webhook deleted");
        }
        None => {
            debug!(webhook_id = %webhook_id, "Webhook record has no vendor gid");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
