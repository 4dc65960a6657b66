// crates/sync-engine/src/gateway.rs
//! Remote data gateway

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use shopsync_core::SyncRecord;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Network boundary for fetching and uploading records
///
/// Timeouts are the implementation's business. Uploads must be idempotent
/// by record `id` and `version`, since an interrupted queue drain re-sends
/// records the remote may already hold.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn fetch_records(&self, user_id: &str) -> Result<Vec<SyncRecord>>;

    async fn upload_records(&self, user_id: &str, records: &[SyncRecord]) -> Result<()>;
}

/// In-process remote, shared by several engines to simulate devices
#[derive(Debug, Default)]
pub struct MemoryGateway {
    records: Mutex<HashMap<String, BTreeMap<String, SyncRecord>>>,
    fetch_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    fail_fetch: AtomicBool,
    upload_failure: Mutex<Option<UploadFailure>>,
}

#[derive(Debug, Clone, Copy)]
struct UploadFailure {
    from_call: usize,
    seen: usize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent fetch fail with a network error
    pub fn set_fetch_failure(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Fails upload calls starting at the `n`th one (1-based) after this call
    ///
    /// `None` clears the knob.
    pub fn set_upload_failure(&self, from_call: Option<usize>) -> Result<()> {
        let mut failure = self
            .upload_failure
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        *failure = from_call.map(|from_call| UploadFailure { from_call, seen: 0 });
        Ok(())
    }

    /// Number of `fetch_records` calls so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `upload_records` calls so far, failed ones included
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Seeds the remote side directly
    pub fn insert(&self, user_id: &str, record: SyncRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        records
            .entry(user_id.to_string())
            .or_default()
            .insert(record.id.clone(), record);
        Ok(())
    }

    /// Returns the remote record with `id` for a user
    pub fn get(&self, user_id: &str, id: &str) -> Result<Option<SyncRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        Ok(records.get(user_id).and_then(|r| r.get(id)).cloned())
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn fetch_records(&self, user_id: &str) -> Result<Vec<SyncRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::Network("fetch refused".to_string()));
        }

        let records = self
            .records
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        Ok(records
            .get(user_id)
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upload_records(&self, user_id: &str, uploaded: &[SyncRecord]) -> Result<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut failure = self
                .upload_failure
                .lock()
                .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
            if let Some(f) = failure.as_mut() {
                f.seen += 1;
                if f.seen >= f.from_call {
                    return Err(SyncError::Network(format!(
                        "upload {} refused",
                        f.seen
                    )));
                }
            }
        }

        let mut records = self
            .records
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        let user_records = records.entry(user_id.to_string()).or_default();
        for record in uploaded {
            user_records.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }
}
