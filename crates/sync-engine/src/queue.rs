// crates/sync-engine/src/queue.rs
//! Durable pending-write queue

use crate::error::Result;
use crate::gateway::RemoteGateway;
use crate::store::LocalStore;
use serde::{Deserialize, Serialize};
use shopsync_core::{SyncRecord, Timestamp};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store key holding the queue
pub const QUEUE_KEY: &str = "sync_queue";

/// A write captured while offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedWrite {
    pub entry_id: String,
    pub user_id: String,
    pub record: SyncRecord,
    pub queued_at: Timestamp,
}

/// Append-only list of writes persisted through the local store
///
/// Entries are only removed after a drain has uploaded every one of them.
pub struct SyncQueue {
    store: Arc<dyn LocalStore>,
    lock: Mutex<()>,
}

impl SyncQueue {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Appends a write for `user_id`
    pub async fn enqueue(&self, user_id: &str, record: SyncRecord) -> Result<QueuedWrite> {
        let entry = QueuedWrite {
            entry_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            record,
            queued_at: Timestamp::now(),
        };

        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.push(entry.clone());
        self.save(&entries).await?;

        log::debug!(
            "Queued {} v{} for {} ({} pending)",
            entry.record.id,
            entry.record.version,
            user_id,
            entries.len()
        );
        Ok(entry)
    }

    /// Returns all entries in enqueue order
    pub async fn entries(&self) -> Result<Vec<QueuedWrite>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Returns the entries belonging to one user, in enqueue order
    pub async fn entries_for(&self, user_id: &str) -> Result<Vec<QueuedWrite>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect())
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.entries().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Drops every entry
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store.remove(QUEUE_KEY).await
    }

    /// Uploads a user's queued writes in order, then removes them
    ///
    /// Records go out one per upload call, and only when they fast-forward
    /// the remote copy: the remote has no record with that id, or its copy
    /// was last written by the same device at the same or a lower version.
    /// Any other entry is skipped; its write is already in the local store
    /// and the next pass reconciles it with the remote.
    ///
    /// If any upload fails the error is returned and nothing is removed, so
    /// already-sent records are sent again on the next drain. Entries queued
    /// while the drain runs are kept. Returns the number of records uploaded.
    pub async fn drain(&self, user_id: &str, gateway: &dyn RemoteGateway) -> Result<usize> {
        let pending = self.entries_for(user_id).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut remote: HashMap<String, (u64, String)> = gateway
            .fetch_records(user_id)
            .await?
            .into_iter()
            .map(|r| (r.id, (r.version, r.device_id)))
            .collect();

        let mut uploaded = 0;
        for (i, entry) in pending.iter().enumerate() {
            let record = &entry.record;
            if !fast_forwards(remote.get(&record.id), record) {
                log::info!(
                    "Not uploading queued {} v{}: remote has moved on, leaving it to the next pass",
                    record.id,
                    record.version
                );
                continue;
            }

            if let Err(e) = gateway
                .upload_records(user_id, std::slice::from_ref(record))
                .await
            {
                log::warn!(
                    "Queue drain for {} stopped at {}/{}: {}",
                    user_id,
                    i + 1,
                    pending.len(),
                    e
                );
                return Err(e);
            }
            remote.insert(
                record.id.clone(),
                (record.version, record.device_id.clone()),
            );
            uploaded += 1;
        }

        let drained: HashSet<&str> = pending.iter().map(|e| e.entry_id.as_str()).collect();
        let _guard = self.lock.lock().await;
        let remaining: Vec<QueuedWrite> = self
            .load()
            .await?
            .into_iter()
            .filter(|e| !drained.contains(e.entry_id.as_str()))
            .collect();
        if remaining.is_empty() {
            self.store.remove(QUEUE_KEY).await?;
        } else {
            self.save(&remaining).await?;
        }

        log::info!(
            "Drained {} queued writes for {} ({} uploaded)",
            pending.len(),
            user_id,
            uploaded
        );
        Ok(uploaded)
    }

    async fn load(&self) -> Result<Vec<QueuedWrite>> {
        match self.store.get(QUEUE_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, entries: &[QueuedWrite]) -> Result<()> {
        self.store
            .set(QUEUE_KEY, serde_json::to_value(entries)?)
            .await
    }
}

fn fast_forwards(remote: Option<&(u64, String)>, record: &SyncRecord) -> bool {
    match remote {
        None => true,
        Some((version, device_id)) => {
            *device_id == record.device_id && *version <= record.version
        }
    }
}
