//! # Webhook Registry
//!
//! Per-profile mapping from a locally generated [`WebhookId`] to the vendor
//! subscription it correlates with.
//!
//! The registry is plain data. Nothing here performs I/O; whoever mutates a
//! registry is responsible for saving the owning profile afterwards.

use crate::WebhookId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A vendor subscription as known locally.
///
/// Created without a secret when the subscription is requested and completed
/// when the vendor's handshake delivers the secret. A record with no secret is
/// *pending*: it accepts the handshake but never a signed event.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRecord {
    /// Vendor-assigned webhook gid, used only for vendor API calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    /// Shared HMAC key delivered by the handshake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl WebhookRecord {
    /// True while the handshake has not delivered a secret.
    pub fn is_pending(&self) -> bool {
        self.secret.is_none()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }
}

impl fmt::Debug for WebhookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookRecord")
            .field("resource_id", &self.resource_id)
            .field("secret", &self.secret.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Partial record used for merge-upserts.
///
/// Fields left as `None` keep whatever the stored record already has.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WebhookRecordUpdate {
    pub resource_id: Option<String>,
    pub secret: Option<String>,
}

impl WebhookRecordUpdate {
    pub fn resource_id(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            secret: None,
        }
    }

    pub fn secret(secret: impl Into<String>) -> Self {
        Self {
            resource_id: None,
            secret: Some(secret.into()),
        }
    }
}

impl fmt::Debug for WebhookRecordUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookRecordUpdate")
            .field("resource_id", &self.resource_id)
            .field("secret", &self.secret.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// The webhook records owned by one user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebhookRegistry {
    records: BTreeMap<WebhookId, WebhookRecord>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, webhook_id: &WebhookId) -> Option<&WebhookRecord> {
        self.records.get(webhook_id)
    }

    /// Insert or merge a record.
    ///
    /// Only the fields set on `update` are written; an existing secret survives
    /// an update that only carries a resource id and vice versa.
    pub fn put(&mut self, webhook_id: WebhookId, update: WebhookRecordUpdate) -> &WebhookRecord {
        let record = self.records.entry(webhook_id).or_default();
        if let Some(resource_id) = update.resource_id {
            record.resource_id = Some(resource_id);
        }
        if let Some(secret) = update.secret {
            record.secret = Some(secret);
        }
        record
    }

    pub fn remove(&mut self, webhook_id: &WebhookId) -> Option<WebhookRecord> {
        self.records.remove(webhook_id)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<WebhookId> {
        self.records.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WebhookId, &WebhookRecord)> {
        self.records.iter()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
