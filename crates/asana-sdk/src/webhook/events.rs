//! Asana webhook event payloads.
//!
//! An event delivery body has the shape `{"events": [ ... ]}`. Asana events are
//! compact: they name what changed and leave it to the receiver to fetch
//! details. Fields the connector does not model are kept in `extra`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::client::ResourceRef;

/// Body of a webhook event delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventBatch {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

impl EventBatch {
    /// Parse a delivery body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// A single Asana webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// `added`, `changed`, `removed`, `deleted` or `undeleted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ResourceRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceRef>,

    /// Present on `changed` events: the field and how it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
