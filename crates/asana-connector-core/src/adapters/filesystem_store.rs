//! # Filesystem User Store
//!
//! Local filesystem implementation of [`UserStore`] for single-instance
//! deployments and development.

use crate::platform::{ConnectorContext, UserStore};
use crate::profile::{UserKey, UserProfile};
use crate::StorageError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Filesystem-based user store
///
/// Stores each profile as a JSON file: `<base>/<user>.json`, or
/// `<base>/<vendor>/<user>.json` for vendor-scoped users.
///
/// # Examples
///
/// ```no_run
/// use asana_connector_core::adapters::FilesystemUserStore;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemUserStore::new(PathBuf::from("./data/users")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemUserStore {
    base_path: PathBuf,
}

impl FilesystemUserStore {
    /// Create new filesystem user store
    ///
    /// # Errors
    ///
    /// Returns error if base path cannot be created.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: base_path.display().to_string(),
                message: format!("Failed to create base directory: {}", e),
            })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn user_path(&self, key: &UserKey) -> PathBuf {
        let user_file = format!("{}.json", path_component(key.vendor_user_id.as_str()));
        match &key.vendor_id {
            Some(vendor_id) => self
                .base_path
                .join(path_component(vendor_id.as_str()))
                .join(user_file),
            None => self.base_path.join(user_file),
        }
    }
}

/// Percent-encode an identifier into a single safe path component.
///
/// Dots are encoded too so `.` and `..` can never address another directory.
fn path_component(value: &str) -> String {
    urlencoding::encode(value).replace('.', "%2E")
}

#[async_trait]
impl UserStore for FilesystemUserStore {
    async fn get_user(
        &self,
        _ctx: &ConnectorContext,
        key: &UserKey,
    ) -> Result<Option<UserProfile>, StorageError> {
        let path = self.user_path(key);

        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    key: key.storage_key(),
                    message: e.to_string(),
                })
            }
        };

        let profile = serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
            key: key.storage_key(),
            message: e.to_string(),
        })?;

        Ok(Some(profile))
    }

    async fn save_user(
        &self,
        _ctx: &ConnectorContext,
        profile: &UserProfile,
    ) -> Result<(), StorageError> {
        let key = profile.key();
        let path = self.user_path(&key);
        let write_failed = |message: String| StorageError::WriteFailed {
            key: key.storage_key(),
            message,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(format!("Failed to create directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(profile)
            .map_err(|e| write_failed(format!("Failed to serialize profile: {}", e)))?;

        // Write to temporary file first, then rename over the target
        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| write_failed(format!("Failed to create temp file: {}", e)))?;

        file.write_all(json.as_bytes())
            .await
            .map_err(|e| write_failed(format!("Failed to write profile: {}", e)))?;

        file.flush()
            .await
            .map_err(|e| write_failed(format!("Failed to flush file: {}", e)))?;

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| write_failed(format!("Failed to rename temp file: {}", e)))?;

        debug!(path = %path.display(), "Saved user profile");
        Ok(())
    }
}

#[cfg(test)]
#[path = "filesystem_store_tests.rs"]
mod tests;
