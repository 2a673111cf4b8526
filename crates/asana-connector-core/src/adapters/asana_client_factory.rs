//! Builds [`AsanaClient`]s from a profile's access token.

use crate::platform::{ConnectorContext, TokenProvider, VendorClientFactory};
use crate::profile::UserProfile;
use crate::ConnectorError;
use asana_sdk::{AsanaApi, AsanaClient, ClientConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Default [`VendorClientFactory`]: token from a [`TokenProvider`], HTTP
/// settings from a shared [`ClientConfig`].
pub struct AsanaClientFactory {
    tokens: Arc<dyn TokenProvider>,
    config: ClientConfig,
}

impl AsanaClientFactory {
    pub fn new(tokens: Arc<dyn TokenProvider>, config: ClientConfig) -> Self {
        Self { tokens, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl VendorClientFactory for AsanaClientFactory {
    async fn create_client(
        &self,
        ctx: &ConnectorContext,
        profile: &UserProfile,
    ) -> Result<Arc<dyn AsanaApi>, ConnectorError> {
        let token = self.tokens.ensure_access_token(ctx, profile).await?;

        let client = AsanaClient::builder(token.access_token)
            .config(self.config.clone())
            .build()?;

        Ok(Arc::new(client))
    }
}

#[cfg(test)]
#[path = "asana_client_factory_tests.rs"]
mod tests;
