// crates/sync-engine/src/driver.rs
//! Sync driver: decides when passes run

use crate::engine::SyncEngine;
use crate::error::{Result, SyncError};
use crate::resolver::ManualResolution;
use crate::types::{SyncConflict, SyncResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopsync_core::SyncRecord;
use shopsync_resilience::{Backoff, RetryPolicy};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration for the sync driver
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Run passes periodically once `start_auto_sync` is called
    pub auto_sync: bool,
    /// Time between periodic passes
    pub interval: Duration,
    /// Run a pass when the app returns to the foreground
    pub sync_on_foreground: bool,
    /// Spacing of retries after failed passes
    pub backoff: RetryPolicy,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            auto_sync: true,
            interval: Duration::from_secs(300),
            sync_on_foreground: true,
            backoff: RetryPolicy::default(),
        }
    }
}

/// Coarse driver state for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Offline,
    Error,
}

/// What the driver knows about recent passes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub state: SyncState,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_result: Option<SyncResult>,
    pub consecutive_failures: usize,
}

struct DriverInner {
    engine: Arc<SyncEngine>,
    user_id: String,
    settings: DriverSettings,
    status: Mutex<SyncStatus>,
    backoff: Mutex<Backoff>,
    auto_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DriverInner {
    fn drop(&mut self) {
        if let Ok(mut task) = self.auto_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

/// Triggers passes for one user from manual, periodic and lifecycle events
///
/// Every trigger goes through the engine's per-user lock, so triggers that
/// race never run two passes at once. Cloning is cheap and shares state.
#[derive(Clone)]
pub struct SyncDriver {
    inner: Arc<DriverInner>,
}

impl SyncDriver {
    pub fn new(engine: Arc<SyncEngine>, user_id: impl Into<String>, settings: DriverSettings) -> Self {
        let backoff = Backoff::new(settings.backoff.clone());
        Self {
            inner: Arc::new(DriverInner {
                engine,
                user_id: user_id.into(),
                settings,
                status: Mutex::new(SyncStatus::default()),
                backoff: Mutex::new(backoff),
                auto_task: Mutex::new(None),
            }),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.inner.engine
    }

    /// Runs a pass, or rejects if one is already running for this user
    pub async fn sync_data(&self) -> SyncResult {
        self.set_state(SyncState::Syncing);
        let result = self.inner.engine.try_sync_user_data(&self.inner.user_id).await;
        self.record(&result);
        result
    }

    /// Runs a pass, waiting for any pass already running
    pub async fn force_sync(&self) -> SyncResult {
        self.set_state(SyncState::Syncing);
        let result = self.inner.engine.sync_user_data(&self.inner.user_id).await;
        self.record(&result);
        result
    }

    /// Foreground-resume trigger
    ///
    /// Returns `None` when foreground syncing is disabled or the device is
    /// offline.
    pub async fn on_foreground(&self) -> Option<SyncResult> {
        if !self.inner.settings.sync_on_foreground {
            return None;
        }
        match self.inner.engine.is_device_online() {
            Ok(true) => Some(self.sync_data().await),
            Ok(false) => None,
            Err(e) => {
                log::warn!("Cannot read online flag: {}", e);
                None
            }
        }
    }

    /// Connectivity change
    ///
    /// Coming online drains the pending-write queue and then runs a pass.
    /// Going offline only updates state.
    pub async fn set_online(&self, online: bool) -> Result<Option<SyncResult>> {
        self.inner.engine.set_online_status(online).await?;
        if !online {
            self.set_state(SyncState::Offline);
            return Ok(None);
        }

        match self.inner.engine.process_sync_queue(&self.inner.user_id).await {
            Ok(0) => {}
            Ok(n) => log::info!("Uploaded {} queued writes for {}", n, self.inner.user_id),
            Err(e) => log::warn!("Queue drain for {} failed: {}", self.inner.user_id, e),
        }
        Ok(Some(self.force_sync().await))
    }

    /// Starts periodic passes
    ///
    /// Returns false if auto sync is disabled or already running. Must be
    /// called from within a tokio runtime.
    pub fn start_auto_sync(&self) -> bool {
        if !self.inner.settings.auto_sync {
            return false;
        }
        let Ok(mut task) = self.inner.auto_task.lock() else {
            return false;
        };
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let weak = Arc::downgrade(&self.inner);
        *task = Some(tokio::spawn(auto_sync_loop(weak)));
        log::info!(
            "Auto sync started for {} every {:?}",
            self.inner.user_id,
            self.inner.settings.interval
        );
        true
    }

    /// Stops periodic passes; returns false if none were running
    pub fn stop_auto_sync(&self) -> bool {
        let handle = match self.inner.auto_task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => None,
        };
        match handle {
            Some(handle) => {
                handle.abort();
                log::info!("Auto sync stopped for {}", self.inner.user_id);
                true
            }
            None => false,
        }
    }

    pub fn is_auto_syncing(&self) -> bool {
        self.inner
            .auto_task
            .lock()
            .map(|task| task.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Delay before the next periodic pass
    pub fn next_delay(&self) -> Duration {
        self.inner
            .backoff
            .lock()
            .map(|b| b.next_delay(self.inner.settings.interval))
            .unwrap_or(self.inner.settings.interval)
    }

    pub fn status(&self) -> Result<SyncStatus> {
        self.inner
            .status
            .lock()
            .map(|s| s.clone())
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))
    }

    /// Conflicts reported by the last recorded pass
    pub fn conflicts(&self) -> Result<Vec<SyncConflict>> {
        Ok(self
            .status()?
            .last_result
            .map(|r| r.conflicts)
            .unwrap_or_default())
    }

    /// Removes a conflict from the held result and writes the chosen record
    ///
    /// No pass is run; the written record goes out with the next one.
    pub async fn resolve_conflict(
        &self,
        index: usize,
        resolution: ManualResolution,
    ) -> Result<SyncRecord> {
        let conflict = {
            let mut status = self
                .inner
                .status
                .lock()
                .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
            let conflicts = status
                .last_result
                .as_mut()
                .map(|r| &mut r.conflicts)
                .ok_or_else(|| SyncError::InvalidInput("No sync result to resolve".to_string()))?;
            if index >= conflicts.len() {
                return Err(SyncError::InvalidInput(format!(
                    "Conflict index {} out of range ({} conflicts)",
                    index,
                    conflicts.len()
                )));
            }
            conflicts.remove(index)
        };

        self.inner
            .engine
            .apply_resolution(&self.inner.user_id, &conflict, resolution)
            .await
    }

    fn set_state(&self, state: SyncState) {
        match self.inner.status.lock() {
            Ok(mut status) => status.state = state,
            Err(_) => log::error!("Sync status lock poisoned"),
        }
    }

    fn record(&self, result: &SyncResult) {
        let (Ok(mut status), Ok(mut backoff)) =
            (self.inner.status.lock(), self.inner.backoff.lock())
        else {
            log::error!("Sync status lock poisoned");
            return;
        };

        if result.success {
            backoff.record_success();
            status.state = SyncState::Idle;
            status.last_sync = Some(Utc::now());
        } else if result.is_offline() {
            status.state = SyncState::Offline;
        } else if is_rejection(result) {
            // the running pass records its own outcome
            return;
        } else {
            let delay = backoff.record_failure();
            status.state = SyncState::Error;
            log::warn!(
                "Sync for {} failed ({} in a row), next attempt in {:?}: {}",
                self.inner.user_id,
                backoff.failures(),
                delay.min(self.inner.settings.interval),
                result.errors.join("; ")
            );
        }
        status.consecutive_failures = backoff.failures();
        status.last_result = Some(result.clone());
    }
}

fn is_rejection(result: &SyncResult) -> bool {
    !result.success && result.errors == [SyncError::SyncInProgress.to_string()]
}

async fn auto_sync_loop(inner: Weak<DriverInner>) {
    loop {
        let delay = match inner.upgrade() {
            Some(inner) => SyncDriver { inner }.next_delay(),
            None => return,
        };
        tokio::time::sleep(delay).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let driver = SyncDriver { inner };
        match driver.inner.engine.is_device_online() {
            Ok(true) => {
                let result = driver.sync_data().await;
                log::debug!(
                    "Periodic sync for {}: success={}",
                    driver.user_id(),
                    result.success
                );
            }
            Ok(false) => log::debug!("Offline, skipping periodic sync"),
            Err(e) => log::warn!("Cannot read online flag: {}", e),
        }
    }
}
