use std::collections::HashMap as StdHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;

/// String key-value backend holding the persisted session.
/// `remove` of an absent key is a no-op and must not fail.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// One-time preparation (create directories, open handles). Called once by
    /// `SessionStore` before the first access.
    async fn prepare(&self) -> Result<(), StorageError> { Ok(()) }
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process backend; the session lives as long as the process.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    map: Arc<parking_lot::RwLock<StdHashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.map.read().len() }
    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
    /// Snapshot of all keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut k: Vec<String> = self.map.read().keys().cloned().collect();
        k.sort();
        k
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map.write().remove(key);
        Ok(())
    }
}

/// Single JSON document on disk (`{"key": "value", ...}`). Writes go through a
/// temp file and a rename so a crash never leaves a half-written document.
/// A document that fails to parse reports `StorageError::Corrupt` on read and
/// is replaced wholesale by the next write or remove.
#[derive(Clone)]
pub struct FileBackend {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Arc::new(tokio::sync::Mutex::new(())) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn tmp_path(&self) -> PathBuf { self.path.with_extension("json.tmp") }

    async fn load_map(&self) -> Result<StdHashMap<String, String>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StdHashMap::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) { return Ok(StdHashMap::new()); }
        serde_json::from_slice::<StdHashMap<String, String>>(&bytes).map_err(|e| StorageError::Corrupt {
            key: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Current document for a read-modify-write; a corrupt document is dropped
    /// and reported through the returned flag.
    async fn load_for_update(&self) -> Result<(StdHashMap<String, String>, bool), StorageError> {
        match self.load_map().await {
            Ok(m) => Ok((m, false)),
            Err(StorageError::Corrupt { message, .. }) => {
                debug!(path = %self.path.display(), error = %message, "kv_file_corrupt_reset");
                Ok((StdHashMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn save_map(&self, map: &StdHashMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(map).map_err(|e| StorageError::Io(e.to_string()))?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn prepare(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::Unavailable(format!("{}: {}", parent.display(), e)))?;
            }
        }
        debug!(path = %self.path.display(), "kv_file_ready");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load_map().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _g = self.write_lock.lock().await;
        let (mut map, _) = self.load_for_update().await?;
        map.insert(key.to_string(), value.to_string());
        self.save_map(&map).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _g = self.write_lock.lock().await;
        let (mut map, was_corrupt) = self.load_for_update().await?;
        if map.remove(key).is_none() && !was_corrupt {
            return Ok(());
        }
        self.save_map(&map).await
    }
}
