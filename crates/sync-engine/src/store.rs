// crates/sync-engine/src/store.rs
//! Local record store

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key-value persistence for per-type state blobs
///
/// Keys are short ASCII strings such as `cart_<userId>`; values are
/// arbitrary JSON. A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store, used in tests and as a scratch store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored keys, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store with one `<key>.json` file per key
///
/// Writes go to a temporary file in the same directory which is then
/// persisted over the target, so a crash never leaves a torn value behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| SyncError::Storage(format!("{}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(SyncError::InvalidInput("Store key cannot be empty".to_string()));
        }
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(self.root.join(format!("{}.json", file_name)))
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SyncError::Storage(format!("{}: {}", path.display(), e)));
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(&value)?;
        let dir = self.root.clone();

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &bytes))
            .await
            .map_err(|e| SyncError::Storage(format!("Write task failed: {}", e)))?
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Storage(format!("{}: {}", path.display(), e))),
        }
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| SyncError::Storage(format!("{}: {}", dir.display(), e)))?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;
    temp_file
        .persist(path)
        .map_err(|e| SyncError::Storage(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("cart_u1").await.unwrap(), None);

        store.set("cart_u1", json!([1, 2])).await.unwrap();
        assert_eq!(store.get("cart_u1").await.unwrap(), Some(json!([1, 2])));

        store.remove("cart_u1").await.unwrap();
        assert_eq!(store.get("cart_u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        store.set("preferences_u1", json!({"theme": "dark"})).await.unwrap();

        let reopened = FileStore::open(temp_dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("preferences_u1").await.unwrap(),
            Some(json!({"theme": "dark"}))
        );
        assert!(temp_dir.path().join("preferences_u1.json").exists());
    }

    #[tokio::test]
    async fn test_file_store_sanitizes_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        store.set("cart_../../etc", json!([])).await.unwrap();

        assert!(temp_dir.path().join("cart_______etc.json").exists());
        assert_eq!(store.get("cart_../../etc").await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn test_file_store_missing_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();

        assert_eq!(store.get("wishlist_u1").await.unwrap(), None);
        store.remove("wishlist_u1").await.unwrap();
        assert!(store.get("").await.is_err());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_value_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        std::fs::write(temp_dir.path().join("cart_u1.json"), "{not json").unwrap();

        assert!(matches!(
            store.get("cart_u1").await,
            Err(SyncError::Serialization(_))
        ));
    }
}
