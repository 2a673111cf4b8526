//! # Asana SDK
//!
//! Software Development Kit for the Asana connector: a typed REST client for the
//! handful of Asana API calls the connector makes, OAuth token types, and the
//! webhook handshake/signature protocol.
//!
//! This SDK provides:
//! - [`client::AsanaClient`] for `users/me` and webhook create/delete
//! - [`auth::TokenContext`] for stored OAuth token material
//! - [`webhook::SignatureVerifier`] for HMAC-SHA256 event verification
//! - [`webhook::EventBatch`] for event delivery payloads
//!
//! # Examples
//!
//! ```rust,no_run
//! use asana_sdk::auth::AccessToken;
//! use asana_sdk::client::{AsanaApi, AsanaClient, CreateWebhookRequest, WebhookFilter, WebhookFilterOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AsanaClient::builder(AccessToken::new("0/token")).build()?;
//!
//! let options = WebhookFilterOptions {
//!     filters: vec![WebhookFilter::new("task", "changed")],
//! };
//! let request = CreateWebhookRequest::new("1199170056173519", "https://example.com/hook", &options);
//! let webhook = client.create_webhook(&request).await?;
//! client.delete_webhook(&webhook.gid).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod webhook;

// Re-export commonly used types at crate root for convenience
pub use error::{ApiError, TokenError};

pub use auth::{AccessToken, TokenContext, TokenExchangeResponse, TokenUser};
pub use client::{AsanaApi, AsanaClient, AsanaUser, ClientConfig};
pub use webhook::{EventBatch, SignatureVerifier, WebhookEvent};
