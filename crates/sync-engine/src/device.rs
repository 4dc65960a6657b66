// crates/sync-engine/src/device.rs
//! Device identity provider

use crate::store::LocalStore;
use serde_json::Value;
use shopsync_core::Timestamp;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Store key holding the persisted device id
pub const DEVICE_ID_KEY: &str = "device_id";

/// Lazily creates and persists a stable per-install device identifier
///
/// The id has the form `<platform>_<millis>_<suffix>`. After the first call
/// the cached value is returned without touching the store.
pub struct DeviceIdentity {
    store: Arc<dyn LocalStore>,
    platform: String,
    cached: OnceCell<String>,
}

impl DeviceIdentity {
    pub fn new(store: Arc<dyn LocalStore>, platform: impl Into<String>) -> Self {
        Self {
            store,
            platform: platform.into(),
            cached: OnceCell::new(),
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Returns the device id, creating and persisting it on first use
    ///
    /// Never fails. If the store cannot be read or written the generated id
    /// lives in memory for the rest of the process.
    pub async fn device_id(&self) -> String {
        self.cached
            .get_or_init(|| self.load_or_create())
            .await
            .clone()
    }

    async fn load_or_create(&self) -> String {
        match self.store.get(DEVICE_ID_KEY).await {
            Ok(Some(Value::String(id))) if !id.is_empty() => {
                log::debug!("Loaded device id {}", id);
                return id;
            }
            Ok(_) => {}
            Err(e) => log::warn!("Failed to read device id: {}", e),
        }

        let id = generate_device_id(&self.platform);
        match self.store.set(DEVICE_ID_KEY, Value::String(id.clone())).await {
            Ok(()) => log::info!("Created device id {}", id),
            Err(e) => log::warn!(
                "Failed to persist device id {}, keeping it in memory: {}",
                id,
                e
            ),
        }
        id
    }
}

fn generate_device_id(platform: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        platform,
        Timestamp::now().as_millis(),
        &suffix[..9]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SyncError};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocalStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::Storage("read-only".to_string()))
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::Storage("read-only".to_string()))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_id_is_stable_and_persisted() {
        let store = Arc::new(MemoryStore::new());
        let identity = DeviceIdentity::new(store.clone(), "ios");

        let first = identity.device_id().await;
        let second = identity.device_id().await;
        assert_eq!(first, second);
        assert!(first.starts_with("ios_"));
        assert_eq!(first.split('_').count(), 3);

        let stored = store.get(DEVICE_ID_KEY).await.unwrap();
        assert_eq!(stored, Some(Value::String(first.clone())));

        let reopened = DeviceIdentity::new(store, "ios");
        assert_eq!(reopened.device_id().await, first);
    }

    #[tokio::test]
    async fn test_persist_failure_falls_back_to_memory() {
        let store = Arc::new(BrokenStore {
            calls: AtomicUsize::new(0),
        });
        let identity = DeviceIdentity::new(store.clone(), "web");

        let first = identity.device_id().await;
        let second = identity.device_id().await;
        assert_eq!(first, second);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(generate_device_id("android"), generate_device_id("android"));
    }
}
