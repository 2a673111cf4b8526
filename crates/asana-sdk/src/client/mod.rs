//! Asana API client for authenticated operations.
//!
//! This module provides the [`AsanaApi`] trait the connector depends on and the
//! [`AsanaClient`] implementation that talks to Asana's REST API with an OAuth
//! bearer token. Only the operations the connector needs are modelled:
//! identity confirmation (`GET /users/me`) and webhook subscription management
//! (`POST /webhooks`, `DELETE /webhooks/{gid}`).

mod types;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::AccessToken;
use crate::error::ApiError;

pub use types::{
    AsanaUser, CreateWebhookRequest, ErrorBody, ErrorDetail, ResourceRef, Webhook, WebhookFilter,
    WebhookFilterOptions,
};

/// Operations the connector performs against the Asana API.
///
/// Implemented by [`AsanaClient`]; tests substitute in-process doubles.
#[async_trait]
pub trait AsanaApi: Send + Sync {
    /// Confirm the identity behind the current token (`GET /users/me`).
    async fn get_identity(&self) -> Result<AsanaUser, ApiError>;

    /// Create a webhook subscription (`POST /webhooks`).
    ///
    /// Asana performs the `X-Hook-Secret` handshake against `target` before
    /// this call returns.
    async fn create_webhook(&self, request: &CreateWebhookRequest) -> Result<Webhook, ApiError>;

    /// Delete a webhook subscription by its gid (`DELETE /webhooks/{gid}`).
    async fn delete_webhook(&self, webhook_gid: &str) -> Result<(), ApiError>;
}

/// Configuration for Asana API client behavior.
///
/// # Examples
///
/// ```
/// use asana_sdk::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(10))
///     .with_asana_api_url("http://localhost:9000");
/// assert_eq!(config.asana_api_url, "http://localhost:9000");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string for API requests
    pub user_agent: String,
    /// Request timeout duration
    pub timeout: Duration,
    /// Asana API base URL (including the version segment)
    pub asana_api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "asana-connector/0.1.0".to_string(),
            timeout: Duration::from_secs(30),
            asana_api_url: "https://app.asana.com/api/1.0".to_string(),
        }
    }
}

impl ClientConfig {
    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the Asana API base URL. A trailing slash is ignored.
    pub fn with_asana_api_url(mut self, url: impl Into<String>) -> Self {
        self.asana_api_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Asana API client authenticated as a single user.
///
/// # Examples
///
/// ```no_run
/// # use asana_sdk::client::{AsanaApi, AsanaClient, ClientConfig};
/// # use asana_sdk::auth::AccessToken;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AsanaClient::builder(AccessToken::new("0/token"))
///     .config(ClientConfig::default())
///     .build()?;
///
/// let me = client.get_identity().await?;
/// println!("Connected as {}", me.gid);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AsanaClient {
    token: AccessToken,
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl AsanaClient {
    /// Create a new builder for constructing an Asana client.
    pub fn builder(token: AccessToken) -> AsanaClientBuilder {
        AsanaClientBuilder::new(token)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.asana_api_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .bearer_auth(self.token.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }

    async fn read_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let envelope: types::DataEnvelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl AsanaApi for AsanaClient {
    async fn get_identity(&self) -> Result<AsanaUser, ApiError> {
        let response = self
            .send(self.http_client.get(self.url("/users/me")))
            .await?;
        Self::read_data(response).await
    }

    async fn create_webhook(&self, request: &CreateWebhookRequest) -> Result<Webhook, ApiError> {
        debug!(resource = %request.resource, "Creating Asana webhook");

        let body = types::DataEnvelope { data: request };
        let response = self
            .send(self.http_client.post(self.url("/webhooks")).json(&body))
            .await?;
        Self::read_data(response).await
    }

    async fn delete_webhook(&self, webhook_gid: &str) -> Result<(), ApiError> {
        if webhook_gid.is_empty() {
            return Err(ApiError::InvalidRequest {
                message: "webhook gid must not be empty".to_string(),
            });
        }

        debug!(webhook_gid = %webhook_gid, "Deleting Asana webhook");

        let path = format!("/webhooks/{}", webhook_gid);
        self.send(self.http_client.delete(self.url(&path))).await?;
        Ok(())
    }
}

// Security: Don't expose tokens in debug output
impl std::fmt::Debug for AsanaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsanaClient")
            .field("token", &"<REDACTED>")
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for constructing [`AsanaClient`] instances.
#[derive(Debug)]
pub struct AsanaClientBuilder {
    token: AccessToken,
    config: ClientConfig,
}

impl AsanaClientBuilder {
    fn new(token: AccessToken) -> Self {
        Self {
            token,
            config: ClientConfig::default(),
        }
    }

    /// Set the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the API URL is not a valid URL or
    /// the HTTP client cannot be constructed.
    pub fn build(self) -> Result<AsanaClient, ApiError> {
        url::Url::parse(&self.config.asana_api_url).map_err(|e| ApiError::InvalidRequest {
            message: format!("invalid Asana API URL '{}': {}", self.config.asana_api_url, e),
        })?;

        let http_client = reqwest::Client::builder()
            .user_agent(&self.config.user_agent)
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(AsanaClient {
            token: self.token,
            http_client,
            config: self.config,
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::HttpClientError(error)
    }
}

/// Build an [`ApiError`] from a non-success response, keeping the vendor's
/// message and code.
fn error_from_response(status: u16, body: &str) -> ApiError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().next());

    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("Asana API request failed with status {}", status)
            } else {
                body.to_string()
            }
        });

    match status {
        401 => ApiError::AuthenticationFailed { message },
        404 => ApiError::NotFound { message },
        _ => ApiError::HttpError {
            status,
            code: detail
                .and_then(|d| d.error)
                .or_else(|| default_error_code(status).map(str::to_string)),
            message,
        },
    }
}

fn default_error_code(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("invalid_request"),
        402 => Some("payment_required"),
        403 => Some("forbidden"),
        429 => Some("rate_limit_enforced"),
        500..=599 => Some("server_error"),
        _ => None,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
