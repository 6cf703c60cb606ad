//!
//! adminkit session storage
//! ------------------------
//! Durable home of the bearer token and the current user. `SessionStore` wraps a
//! `KeyValueBackend` (in-memory or a JSON file) and acquires it lazily: the first
//! access runs the backend's one-time preparation, concurrent first callers share
//! that single in-flight initialization, and later calls reuse the ready handle.
//!
//! Raw `get`/`set`/`remove` report I/O failures as `StorageError`; a corrupt
//! value is never an error, it reads as absent and is cleared. The session-level helpers
//! (`load_token`, `load_user`) never fail: unreadable or corrupt data is logged,
//! the offending keys are cleared, and the value reads as absent.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::models::User;

pub mod kv;

pub use kv::{FileBackend, KeyValueBackend, MemoryBackend};

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "current_user";

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueBackend>,
    ready: Arc<OnceCell<()>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend, ready: Arc::new(OnceCell::new()) }
    }

    pub fn in_memory() -> Self { Self::new(Arc::new(MemoryBackend::new())) }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileBackend::new(path.as_ref())))
    }

    pub fn is_ready(&self) -> bool { self.ready.initialized() }

    /// Ready backend handle. A failed preparation leaves the cell empty so the
    /// next access retries.
    async fn handle(&self) -> Result<&dyn KeyValueBackend, StorageError> {
        self.ready
            .get_or_try_init(|| async {
                self.backend.prepare().await?;
                debug!("session_store_ready");
                Ok::<(), StorageError>(())
            })
            .await?;
        Ok(self.backend.as_ref())
    }

    /// Stored value for `key`. A corrupt value reads as absent and the key is
    /// cleared; only genuine I/O failures are reported.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.handle().await?.get(key).await {
            Err(StorageError::Corrupt { message, .. }) => {
                warn!(key, error = %message, "session_value_corrupt");
                self.discard(&[key]).await;
                Ok(None)
            }
            other => other,
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.handle().await?.set(key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.handle().await?.remove(key).await
    }

    /// Persisted token, or `None` if absent, empty or unreadable.
    pub async fn load_token(&self) -> Option<String> {
        match self.get(TOKEN_KEY).await {
            Ok(Some(t)) if !t.trim().is_empty() => Some(t),
            Ok(Some(_)) => {
                self.discard(&[TOKEN_KEY]).await;
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, code = e.code_str(), "session_token_unreadable");
                self.discard(&[TOKEN_KEY, USER_KEY]).await;
                None
            }
        }
    }

    pub async fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.set(TOKEN_KEY, token).await
    }

    /// Persisted user, or `None` if absent or not decodable.
    pub async fn load_user(&self) -> Option<User> {
        let raw = match self.get(USER_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, code = e.code_str(), "session_user_unreadable");
                self.discard(&[TOKEN_KEY, USER_KEY]).await;
                return None;
            }
        };
        match serde_json::from_str::<User>(&raw) {
            Ok(u) => Some(u),
            Err(e) => {
                warn!(error = %e, "session_user_corrupt");
                self.discard(&[USER_KEY]).await;
                None
            }
        }
    }

    pub async fn save_user(&self, user: &User) -> Result<(), StorageError> {
        let raw = serde_json::to_string(user).map_err(|e| StorageError::Corrupt { key: USER_KEY.into(), message: e.to_string() })?;
        self.set(USER_KEY, &raw).await
    }

    /// Remove both session keys. Attempts every key even if one fails and
    /// reports the first failure.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut first: Option<StorageError> = None;
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.remove(key).await {
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn discard(&self, keys: &[&str]) {
        for key in keys {
            if let Err(e) = self.remove(key).await {
                warn!(key = *key, error = %e, "session_discard_failed");
            }
        }
    }
}
