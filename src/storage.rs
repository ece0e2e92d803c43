// ABOUTME: Persistence collaborator: session store trait with memory and JSON-file backends
// ABOUTME: Full-document overwrite per account plus a current-user marker
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriBot

//! # Session Store
//!
//! Key-value persistence keyed by user email, storing the full session
//! document as one blob: read on session start, overwritten on every state
//! change. A blob that fails to parse entirely is a fatal
//! [`CorruptedSession`](crate::errors::ErrorCode::CorruptedSession); partial
//! repair is never attempted.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::models::session::SessionDocument;

/// The persistence collaborator contract
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session document for an account, if one exists
    async fn load(&self, email: &str) -> AppResult<Option<SessionDocument>>;

    /// Overwrite the session document for an account
    async fn save(&self, email: &str, document: &SessionDocument) -> AppResult<()>;

    /// Remove an account's session document
    async fn delete(&self, email: &str) -> AppResult<()>;

    /// The email of the signed-in account, if any
    async fn current_user(&self) -> AppResult<Option<String>>;

    /// Record or clear the signed-in account
    async fn set_current_user(&self, email: Option<&str>) -> AppResult<()>;
}

/// On-disk / in-memory blob shape: all accounts plus the sign-in marker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreBlob {
    #[serde(rename = "nutribot_users", default)]
    users: HashMap<String, SessionDocument>,
    #[serde(rename = "nutribot_current_user", default)]
    current_user: Option<String>,
}

// ============================================================================
// In-memory store
// ============================================================================

/// Volatile store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: RwLock<StoreBlob>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, email: &str) -> AppResult<Option<SessionDocument>> {
        Ok(self.blob.read().await.users.get(email).cloned())
    }

    async fn save(&self, email: &str, document: &SessionDocument) -> AppResult<()> {
        self.blob
            .write()
            .await
            .users
            .insert(email.to_owned(), document.clone());
        Ok(())
    }

    async fn delete(&self, email: &str) -> AppResult<()> {
        self.blob.write().await.users.remove(email);
        Ok(())
    }

    async fn current_user(&self) -> AppResult<Option<String>> {
        Ok(self.blob.read().await.current_user.clone())
    }

    async fn set_current_user(&self, email: Option<&str>) -> AppResult<()> {
        self.blob.write().await.current_user = email.map(str::to_owned);
        Ok(())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Durable store writing the whole blob to a single JSON file, the desktop
/// analog of the browser's local storage
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles against the file
    io_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store backed by the given file path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    async fn read_blob(&self) -> AppResult<StoreBlob> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                warn!(path = %self.path.display(), error = %e, "session store failed to parse");
                AppError::corrupted_session(format!(
                    "session store at {} is unreadable: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "session store absent, starting empty");
                Ok(StoreBlob::default())
            }
            Err(e) => Err(AppError::storage(format!(
                "could not read session store at {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Read the blob for a read-modify-write cycle. A corrupt blob is
    /// discarded and replaced wholesale on the next write, never repaired.
    async fn read_blob_or_discard(&self) -> AppResult<StoreBlob> {
        match self.read_blob().await {
            Ok(blob) => Ok(blob),
            Err(e) if e.code == crate::errors::ErrorCode::CorruptedSession => {
                warn!(path = %self.path.display(), "discarding corrupt session store");
                Ok(StoreBlob::default())
            }
            Err(e) => Err(e),
        }
    }

    async fn write_blob(&self, blob: &StoreBlob) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_vec_pretty(blob)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self, email: &str) -> AppResult<Option<SessionDocument>> {
        let _guard = self.io_lock.lock().await;
        Ok(self.read_blob().await?.users.remove(email))
    }

    async fn save(&self, email: &str, document: &SessionDocument) -> AppResult<()> {
        let _guard = self.io_lock.lock().await;
        let mut blob = self.read_blob_or_discard().await?;
        blob.users.insert(email.to_owned(), document.clone());
        self.write_blob(&blob).await
    }

    async fn delete(&self, email: &str) -> AppResult<()> {
        let _guard = self.io_lock.lock().await;
        let mut blob = self.read_blob_or_discard().await?;
        blob.users.remove(email);
        self.write_blob(&blob).await
    }

    async fn current_user(&self) -> AppResult<Option<String>> {
        let _guard = self.io_lock.lock().await;
        Ok(self.read_blob().await?.current_user)
    }

    async fn set_current_user(&self, email: Option<&str>) -> AppResult<()> {
        let _guard = self.io_lock.lock().await;
        let mut blob = self.read_blob_or_discard().await?;
        blob.current_user = email.map(str::to_owned);
        self.write_blob(&blob).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::storage_keys;
    use crate::models::user::UserProfile;

    #[test]
    fn test_blob_field_names_match_storage_keys() {
        let blob = StoreBlob::default();
        let value = serde_json::to_value(&blob).unwrap();
        assert!(value.get(storage_keys::USERS).is_some());
        assert!(value
            .as_object()
            .unwrap()
            .contains_key(storage_keys::CURRENT_USER));
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        let document =
            SessionDocument::for_profile(UserProfile::new("Ana", "ana@example.com", 7));

        store.save("ana@example.com", &document).await.unwrap();
        let loaded = store.load("ana@example.com").await.unwrap().unwrap();
        assert_eq!(loaded.profile.name, "Ana");

        store.delete("ana@example.com").await.unwrap();
        assert!(store.load("ana@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_current_user_marker() {
        let store = MemoryStore::new();
        assert!(store.current_user().await.unwrap().is_none());
        store.set_current_user(Some("ana@example.com")).await.unwrap();
        assert_eq!(
            store.current_user().await.unwrap().as_deref(),
            Some("ana@example.com")
        );
        store.set_current_user(None).await.unwrap();
        assert!(store.current_user().await.unwrap().is_none());
    }
}
