//! User profiles and the keys they are stored under.

use crate::registry::WebhookRegistry;
use crate::{VendorId, VendorUserId};
use asana_sdk::{AsanaUser, TokenContext, TokenUser};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one end user: the Asana user gid, optionally scoped by a vendor id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<VendorId>,
    pub vendor_user_id: VendorUserId,
}

impl UserKey {
    pub fn new(vendor_user_id: VendorUserId) -> Self {
        Self {
            vendor_id: None,
            vendor_user_id,
        }
    }

    pub fn with_vendor(vendor_id: VendorId, vendor_user_id: VendorUserId) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            vendor_user_id,
        }
    }

    /// Key the user record is persisted under.
    ///
    /// Each component is percent-encoded so the `/` separator is unambiguous:
    /// `vendor/user` when scoped, `user` otherwise.
    pub fn storage_key(&self) -> String {
        let user = urlencoding::encode(self.vendor_user_id.as_str());
        match &self.vendor_id {
            Some(vendor_id) => format!("{}/{}", urlencoding::encode(vendor_id.as_str()), user),
            None => user.into_owned(),
        }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Who the profile belongs to, as Asana describes them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VendorIdentity {
    pub gid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&AsanaUser> for VendorIdentity {
    fn from(user: &AsanaUser) -> Self {
        Self {
            gid: user.gid.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

impl From<&TokenUser> for VendorIdentity {
    fn from(user: &TokenUser) -> Self {
        Self {
            gid: user.user_id().unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Per-user record persisted by the platform's user store.
///
/// Mutations never persist themselves; callers save the profile through
/// [`crate::platform::UserStore::save_user`] after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub vendor_user_id: VendorUserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<VendorId>,

    #[serde(default)]
    pub identity: VendorIdentity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenContext>,

    #[serde(default)]
    pub webhooks: WebhookRegistry,
}

impl UserProfile {
    /// Create a profile with no token and no webhooks.
    pub fn new(key: UserKey, identity: VendorIdentity) -> Self {
        Self {
            vendor_user_id: key.vendor_user_id,
            vendor_id: key.vendor_id,
            identity,
            token: None,
            webhooks: WebhookRegistry::new(),
        }
    }

    pub fn with_token(mut self, token: TokenContext) -> Self {
        self.token = Some(token);
        self
    }

    pub fn key(&self) -> UserKey {
        UserKey {
            vendor_id: self.vendor_id.clone(),
            vendor_user_id: self.vendor_user_id.clone(),
        }
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
