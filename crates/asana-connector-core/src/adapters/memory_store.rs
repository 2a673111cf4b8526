//! # In-Memory User Store
//!
//! Thread-safe in-memory implementation for testing and development.

use crate::platform::{ConnectorContext, UserStore};
use crate::profile::{UserKey, UserProfile};
use crate::StorageError;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// In-memory user store keyed by [`UserKey::storage_key`].
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with profiles
    pub fn with_users(users: impl IntoIterator<Item = UserProfile>) -> Self {
        let map = users
            .into_iter()
            .map(|profile| (profile.key().storage_key(), profile))
            .collect();
        Self {
            users: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored profiles
    pub fn len(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(
        &self,
        _ctx: &ConnectorContext,
        key: &UserKey,
    ) -> Result<Option<UserProfile>, StorageError> {
        let storage_key = key.storage_key();
        let users = self.users.read().map_err(|e| StorageError::ReadFailed {
            key: storage_key.clone(),
            message: e.to_string(),
        })?;

        Ok(users.get(&storage_key).cloned())
    }

    async fn save_user(
        &self,
        _ctx: &ConnectorContext,
        profile: &UserProfile,
    ) -> Result<(), StorageError> {
        let storage_key = profile.key().storage_key();
        let mut users = self.users.write().map_err(|e| StorageError::WriteFailed {
            key: storage_key.clone(),
            message: e.to_string(),
        })?;

        users.insert(storage_key, profile.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
