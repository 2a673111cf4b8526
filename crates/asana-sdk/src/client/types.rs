//! Request and response bodies for the Asana REST API.

use serde::{Deserialize, Serialize};

/// Asana wraps every request and response body in a `data` field.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// Error response body: `{"errors": [{"message": "...", "help": "..."}]}`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub help: Option<String>,

    /// Machine readable error code, when Asana supplies one.
    #[serde(default)]
    pub error: Option<String>,
}

/// The authenticated user as returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsanaUser {
    pub gid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// Compact reference to an Asana resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub gid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One webhook filter: which resource type, action and fields to deliver.
///
/// # Examples
///
/// ```
/// use asana_sdk::client::WebhookFilter;
///
/// let filter = WebhookFilter::new("task", "changed").with_fields(["custom_fields"]);
/// assert_eq!(filter.fields, vec!["custom_fields".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookFilter {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_subtype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl WebhookFilter {
    pub fn new(resource_type: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_subtype: None,
            action: Some(action.into()),
            fields: Vec::new(),
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Optional settings for a webhook subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WebhookFilterOptions {
    #[serde(default)]
    pub filters: Vec<WebhookFilter>,
}

/// Body of `POST /webhooks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateWebhookRequest {
    /// gid of the resource to subscribe to.
    pub resource: String,

    /// Callback URL Asana delivers the handshake and events to.
    pub target: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<WebhookFilter>,
}

impl CreateWebhookRequest {
    pub fn new(
        resource: impl Into<String>,
        target: impl Into<String>,
        options: &WebhookFilterOptions,
    ) -> Self {
        Self {
            resource: resource.into(),
            target: target.into(),
            filters: options.filters.clone(),
        }
    }
}

/// A webhook subscription as returned by Asana.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    /// gid of the webhook itself; used for deletion.
    pub gid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default)]
    pub active: bool,
}
