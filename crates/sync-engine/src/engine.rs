// crates/sync-engine/src/engine.rs
//! Sync orchestrator

use crate::cache::OfflineCache;
use crate::detector::{ConflictDetector, DEFAULT_TOLERANCE_MS};
use crate::device::DeviceIdentity;
use crate::error::{Result, SyncError};
use crate::gateway::RemoteGateway;
use crate::queue::{QueuedWrite, SyncQueue};
use crate::resolver::{ConflictResolver, ManualResolution};
use crate::store::LocalStore;
use crate::types::{SyncConflict, SyncResult};
use serde_json::Value;
use shopsync_core::{RecordType, ResolutionStrategy, SyncRecord, Timestamp};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

/// Process-wide engine settings, read once at the start of each pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Conflict resolution strategy
    pub strategy: ResolutionStrategy,
    /// Whether the device believes it is online
    pub online: bool,
    /// Tolerance window for timestamp conflicts
    pub tolerance_window_ms: u64,
    /// Platform tag stamped on records this device writes
    pub platform: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            strategy: ResolutionStrategy::default(),
            online: true,
            tolerance_window_ms: DEFAULT_TOLERANCE_MS,
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// Reconciles a user's records between the local store and the remote
///
/// At most one pass runs per user at a time. Passes for different users
/// do not block each other.
pub struct SyncEngine {
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn RemoteGateway>,
    identity: DeviceIdentity,
    queue: SyncQueue,
    settings: RwLock<EngineSettings>,
    user_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    offline_cache: Option<Arc<dyn OfflineCache>>,
}

impl SyncEngine {
    /// Creates an engine over a local store and a remote gateway
    pub fn new(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            identity: DeviceIdentity::new(store.clone(), settings.platform.clone()),
            queue: SyncQueue::new(store.clone()),
            store,
            gateway,
            settings: RwLock::new(settings),
            user_locks: Mutex::new(HashMap::new()),
            offline_cache: None,
        }
    }

    /// Attaches an offline cache whose offline mode follows the online flag
    ///
    /// The cache is put in the mode matching the current flag right away.
    pub async fn with_offline_cache(mut self, cache: Arc<dyn OfflineCache>) -> Result<Self> {
        let online = self.is_device_online()?;
        cache.set_offline_mode(!online).await?;
        self.offline_cache = Some(cache);
        Ok(self)
    }

    /// Returns a snapshot of the current settings
    pub fn settings(&self) -> Result<EngineSettings> {
        self.settings
            .read()
            .map(|s| s.clone())
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))
    }

    fn update_settings(&self, f: impl FnOnce(&mut EngineSettings)) -> Result<()> {
        let mut settings = self
            .settings
            .write()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        f(&mut settings);
        Ok(())
    }

    /// Sets the strategy used by subsequent passes
    pub fn set_conflict_resolution_strategy(&self, strategy: ResolutionStrategy) -> Result<()> {
        self.update_settings(|s| s.strategy = strategy)?;
        log::info!("Conflict resolution strategy set to {}", strategy);
        Ok(())
    }

    /// Sets the online flag and mirrors it into the offline cache
    pub async fn set_online_status(&self, online: bool) -> Result<()> {
        self.update_settings(|s| s.online = online)?;
        log::info!("Device is now {}", if online { "online" } else { "offline" });

        if let Some(cache) = &self.offline_cache {
            cache.set_offline_mode(!online).await?;
        }
        Ok(())
    }

    pub fn is_device_online(&self) -> Result<bool> {
        Ok(self.settings()?.online)
    }

    /// Returns this install's device id
    pub async fn device_id(&self) -> String {
        self.identity.device_id().await
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn offline_cache(&self) -> Option<&Arc<dyn OfflineCache>> {
        self.offline_cache.as_ref()
    }

    /// Appends a record to the pending-write queue
    pub async fn queue_for_sync(&self, user_id: &str, record: SyncRecord) -> Result<QueuedWrite> {
        self.queue.enqueue(user_id, record).await
    }

    /// Uploads the user's queued writes
    ///
    /// A no-op returning 0 while offline or when nothing is queued. Holds the
    /// user's pass lock, so a drain never interleaves with a pass. Writes the
    /// remote has moved past are not uploaded; the next pass merges them from
    /// the local copy.
    pub async fn process_sync_queue(&self, user_id: &str) -> Result<usize> {
        ensure_user(user_id)?;
        if !self.is_device_online()? {
            log::debug!("Offline, not draining queue for {}", user_id);
            return Ok(0);
        }
        let lock = self.user_lock(user_id)?;
        let _guard = lock.lock().await;
        self.queue.drain(user_id, self.gateway.as_ref()).await
    }

    /// Writes a new payload for one record type optimistically
    ///
    /// The stored record supersedes the current local copy. While offline
    /// the record is also queued for upload.
    pub async fn write_local(
        &self,
        user_id: &str,
        record_type: RecordType,
        payload: Value,
    ) -> Result<SyncRecord> {
        ensure_user(user_id)?;
        let lock = self.user_lock(user_id)?;
        let _guard = lock.lock().await;

        let device_id = self.device_id().await;
        let settings = self.settings()?;
        let record = match self.load_local(user_id, record_type).await? {
            Some(current) => current.supersede(payload, device_id),
            None => SyncRecord::new(record_type, user_id, payload, device_id, settings.platform),
        };
        self.store
            .set(
                &record_type.storage_key(user_id),
                serde_json::to_value(&record)?,
            )
            .await?;

        if !settings.online {
            self.queue.enqueue(user_id, record.clone()).await?;
        }
        Ok(record)
    }

    /// Writes the outcome of a manual resolution as the new local copy
    pub async fn apply_resolution(
        &self,
        user_id: &str,
        conflict: &SyncConflict,
        resolution: ManualResolution,
    ) -> Result<SyncRecord> {
        ensure_user(user_id)?;
        let lock = self.user_lock(user_id)?;
        let _guard = lock.lock().await;

        let record = resolution.apply(conflict);
        let current = self.load_local(user_id, record.record_type).await?;
        let record = match current {
            Some(current) if current.version >= record.version => SyncRecord {
                version: current.version + 1,
                ..record
            },
            _ => record,
        };
        self.store
            .set(
                &record.record_type.storage_key(user_id),
                serde_json::to_value(&record)?,
            )
            .await?;

        if !self.is_device_online()? {
            self.queue.enqueue(user_id, record.clone()).await?;
        }
        log::info!(
            "Applied {:?} to {} (v{})",
            resolution,
            record.id,
            record.version
        );
        Ok(record)
    }

    /// Reads the local records of every known type for a user
    pub async fn load_local_records(&self, user_id: &str) -> Result<Vec<SyncRecord>> {
        let mut records = Vec::new();
        for record_type in RecordType::ALL {
            if let Some(record) = self.load_local(user_id, record_type).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn load_local(
        &self,
        user_id: &str,
        record_type: RecordType,
    ) -> Result<Option<SyncRecord>> {
        let Some(value) = self.store.get(&record_type.storage_key(user_id)).await? else {
            return Ok(None);
        };

        let id = SyncRecord::record_id(record_type, user_id);
        match serde_json::from_value::<SyncRecord>(value.clone()) {
            Ok(record) if record.id == id && record.record_type == record_type => Ok(Some(record)),
            _ => {
                // bare payload written by something other than the engine
                log::debug!("Wrapping bare payload under {}", id);
                let settings = self.settings()?;
                Ok(Some(SyncRecord {
                    id,
                    record_type,
                    payload: value,
                    timestamp: Timestamp::from_millis(0),
                    device_id: self.device_id().await,
                    platform: settings.platform,
                    version: 0,
                }))
            }
        }
    }

    /// Runs one synchronization pass for a user
    ///
    /// Waits if a pass for the same user is already running. Never returns
    /// an error; failures are reported in the result.
    pub async fn sync_user_data(&self, user_id: &str) -> SyncResult {
        if let Err(e) = ensure_user(user_id) {
            return SyncResult::failure(vec![e.to_string()]);
        }
        let lock = match self.user_lock(user_id) {
            Ok(lock) => lock,
            Err(e) => return SyncResult::failure(vec![e.to_string()]),
        };
        let _guard = lock.lock().await;
        self.sync_locked(user_id).await
    }

    /// Runs a pass unless one is already running for the user
    ///
    /// A concurrent call is rejected with "Sync already in progress".
    pub async fn try_sync_user_data(&self, user_id: &str) -> SyncResult {
        if let Err(e) = ensure_user(user_id) {
            return SyncResult::failure(vec![e.to_string()]);
        }
        let lock = match self.user_lock(user_id) {
            Ok(lock) => lock,
            Err(e) => return SyncResult::failure(vec![e.to_string()]),
        };
        let Ok(_guard) = lock.try_lock() else {
            log::debug!("Sync for {} already running, rejecting", user_id);
            return SyncResult::failure(vec![SyncError::SyncInProgress.to_string()]);
        };
        self.sync_locked(user_id).await
    }

    fn user_lock(&self, user_id: &str) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        Ok(locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    async fn sync_locked(&self, user_id: &str) -> SyncResult {
        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(e) => return SyncResult::failure(vec![e.to_string()]),
        };
        if !settings.online {
            log::debug!("Offline, skipping sync for {}", user_id);
            return SyncResult::offline();
        }

        match self.run_pass(user_id, &settings).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Sync for {} failed: {}", user_id, e);
                SyncResult::failure(vec![e.to_string()])
            }
        }
    }

    async fn run_pass(&self, user_id: &str, settings: &EngineSettings) -> Result<SyncResult> {
        self.recover_outbox(user_id).await?;

        let local = self.load_local_records(user_id).await?;
        let remote = self.gateway.fetch_records(user_id).await?;

        let conflicts = ConflictDetector::new(settings.tolerance_window_ms).detect(&local, &remote);
        let resolved: HashMap<String, SyncRecord> = ConflictResolver::new(settings.strategy)
            .resolve(&conflicts)
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let final_set = assemble(&local, &remote, &resolved);

        self.write_outbox(user_id, &final_set).await?;
        for record in &final_set {
            self.store
                .set(
                    &record.record_type.storage_key(user_id),
                    serde_json::to_value(record)?,
                )
                .await?;
        }
        self.gateway.upload_records(user_id, &final_set).await?;
        self.store.remove(&outbox_key(user_id)).await?;

        log::info!(
            "Synced {} records for {} ({} conflicts, strategy {})",
            final_set.len(),
            user_id,
            conflicts.len(),
            settings.strategy
        );
        Ok(SyncResult::success(conflicts, final_set.len()))
    }

    async fn write_outbox(&self, user_id: &str, records: &[SyncRecord]) -> Result<()> {
        self.store
            .set(&outbox_key(user_id), serde_json::to_value(records)?)
            .await
    }

    /// Restores local copies from a pass that stopped before its upload
    ///
    /// A local record that is already newer than the outbox copy is left
    /// alone. The outbox itself is replaced by the pass that follows.
    async fn recover_outbox(&self, user_id: &str) -> Result<()> {
        let Some(value) = self.store.get(&outbox_key(user_id)).await? else {
            return Ok(());
        };
        let records: Vec<SyncRecord> = serde_json::from_value(value)?;
        log::warn!(
            "Recovering {} records left in the outbox for {}",
            records.len(),
            user_id
        );

        for record in &records {
            let current = self.load_local(user_id, record.record_type).await?;
            if current.is_none_or(|c| c.version < record.version) {
                self.store
                    .set(
                        &record.record_type.storage_key(user_id),
                        serde_json::to_value(record)?,
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

/// Store key of a user's write-ahead outbox
pub fn outbox_key(user_id: &str) -> String {
    format!("sync_outbox_{}", user_id)
}

fn ensure_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(SyncError::InvalidInput("User id cannot be empty".to_string()));
    }
    Ok(())
}

/// Builds the record set a pass writes back
///
/// Local order first, then remote-only records. Pairs that did not conflict
/// take the remote copy.
fn assemble(
    local: &[SyncRecord],
    remote: &[SyncRecord],
    resolved: &HashMap<String, SyncRecord>,
) -> Vec<SyncRecord> {
    let remote_by_id: HashMap<&str, &SyncRecord> =
        remote.iter().map(|r| (r.id.as_str(), r)).collect();
    let local_ids: HashSet<&str> = local.iter().map(|r| r.id.as_str()).collect();

    let mut final_set = Vec::with_capacity(local.len() + remote.len());
    for record in local {
        let chosen = match (resolved.get(&record.id), remote_by_id.get(record.id.as_str())) {
            (Some(winner), _) => winner.clone(),
            (None, Some(remote_copy)) => {
                if remote_copy.payload != record.payload {
                    log::debug!(
                        "{} v{} differs from remote within tolerance ({} vs {}), taking remote",
                        record.id,
                        record.version,
                        record.device_id,
                        remote_copy.device_id
                    );
                }
                (*remote_copy).clone()
            }
            (None, None) => record.clone(),
        };
        final_set.push(chosen);
    }
    final_set.extend(
        remote
            .iter()
            .filter(|r| !local_ids.contains(r.id.as_str()))
            .cloned(),
    );
    final_set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn engine() -> (Arc<MemoryStore>, Arc<MemoryGateway>, SyncEngine) {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MemoryGateway::new());
        let engine = SyncEngine::new(store.clone(), gateway.clone(), EngineSettings::default());
        (store, gateway, engine)
    }

    fn record(record_type: RecordType, payload: Value, timestamp: i64, version: u64) -> SyncRecord {
        SyncRecord::new(record_type, "u1", payload, "dev-x", "web")
            .with_timestamp(timestamp)
            .with_version(version)
    }

    #[test]
    fn test_assemble_orders_and_passes_through() {
        let local_cart = record(RecordType::Cart, json!([]), 1000, 1);
        let local_prefs = record(RecordType::Preferences, json!({}), 1000, 1);
        let remote_prefs = record(RecordType::Preferences, json!({"same": true}), 1000, 1);
        let remote_wish = record(RecordType::Wishlist, json!([]), 1000, 1);

        let final_set = assemble(
            &[local_prefs, local_cart.clone()],
            &[remote_wish.clone(), remote_prefs.clone()],
            &HashMap::new(),
        );
        assert_eq!(final_set, vec![remote_prefs, local_cart, remote_wish]);
    }

    #[test]
    fn test_assemble_takes_remote_for_divergent_pair_within_tolerance() {
        let local = SyncRecord::new(RecordType::Cart, "u1", json!([{"productId": "a"}]), "dev-a", "web")
            .with_timestamp(1000)
            .with_version(2);
        let remote = SyncRecord::new(RecordType::Cart, "u1", json!([{"productId": "b"}]), "dev-b", "web")
            .with_timestamp(1400)
            .with_version(2);

        let final_set = assemble(&[local], &[remote.clone()], &HashMap::new());
        assert_eq!(final_set, vec![remote]);
    }

    #[tokio::test]
    async fn test_offline_engine_puts_attached_cache_offline() {
        let cache = Arc::new(crate::cache::MemoryOfflineCache::new());
        let engine = SyncEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryGateway::new()),
            EngineSettings {
                online: false,
                ..EngineSettings::default()
            },
        )
        .with_offline_cache(cache.clone())
        .await
        .unwrap();

        assert!(cache.is_offline().unwrap());
        engine.set_online_status(true).await.unwrap();
        assert!(!cache.is_offline().unwrap());
    }

    #[tokio::test]
    async fn test_empty_user_is_rejected() {
        let (_store, gateway, engine) = engine();
        let result = engine.sync_user_data("  ").await;
        assert!(!result.success);
        assert!(result.errors[0].contains("User id"));
        assert_eq!(gateway.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_write_local_supersedes() {
        let (_store, _gateway, engine) = engine();
        let first = engine
            .write_local("u1", RecordType::Cart, json!([{"productId": "p1", "quantity": 1}]))
            .await
            .unwrap();
        let second = engine
            .write_local("u1", RecordType::Cart, json!([{"productId": "p1", "quantity": 2}]))
            .await
            .unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(second.device_id, engine.device_id().await);
        assert!(engine.queue().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_write_local_queues_while_offline() {
        let (_store, _gateway, engine) = engine();
        engine.set_online_status(false).await.unwrap();
        engine
            .write_local("u1", RecordType::Wishlist, json!([{"productId": "p1"}]))
            .await
            .unwrap();

        assert_eq!(engine.queue().len().await.unwrap(), 1);
        assert_eq!(engine.process_sync_queue("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bare_payload_is_wrapped() {
        let (store, _gateway, engine) = engine();
        store
            .set("preferences_u1", json!({"theme": "dark"}))
            .await
            .unwrap();

        let records = engine.load_local_records("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "preferences_u1");
        assert_eq!(records[0].version, 0);
        assert_eq!(records[0].payload, json!({"theme": "dark"}));
    }

    #[tokio::test]
    async fn test_strategy_is_read_per_pass() {
        let (_store, _gateway, engine) = engine();
        engine
            .set_conflict_resolution_strategy(ResolutionStrategy::Manual)
            .unwrap();
        assert_eq!(engine.settings().unwrap().strategy, ResolutionStrategy::Manual);
    }

    #[tokio::test]
    async fn test_outbox_removed_after_pass() {
        let (store, _gateway, engine) = engine();
        engine
            .write_local("u1", RecordType::Cart, json!([]))
            .await
            .unwrap();

        assert!(engine.sync_user_data("u1").await.success);
        assert_eq!(store.get(&outbox_key("u1")).await.unwrap(), None);
    }
}
