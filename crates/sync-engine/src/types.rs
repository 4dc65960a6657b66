// crates/sync-engine/src/types.rs
//! Conflict and pass-result types

use serde::{Deserialize, Serialize};
use shopsync_core::SyncRecord;
use std::fmt;

/// Which divergence condition a conflict reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Write times differ by more than the tolerance window
    Timestamp,
    /// Versions differ
    Version,
    /// Different devices wrote at exactly the same time
    Device,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::Timestamp => write!(f, "timestamp"),
            ConflictType::Version => write!(f, "version"),
            ConflictType::Device => write!(f, "device"),
        }
    }
}

/// A local and a remote record sharing an id, flagged for one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    pub local: SyncRecord,
    pub remote: SyncRecord,
    pub conflict_type: ConflictType,
}

impl SyncConflict {
    pub fn new(local: SyncRecord, remote: SyncRecord, conflict_type: ConflictType) -> Self {
        Self {
            local,
            remote,
            conflict_type,
        }
    }

    /// Id of the conflicting record
    pub fn record_id(&self) -> &str {
        &self.local.id
    }
}

/// Outcome of one orchestrator pass
///
/// Created fresh for every pass and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub conflicts: Vec<SyncConflict>,
    pub synced_items: usize,
    pub errors: Vec<String>,
}

impl SyncResult {
    /// A completed pass
    pub fn success(conflicts: Vec<SyncConflict>, synced_items: usize) -> Self {
        Self {
            success: true,
            conflicts,
            synced_items,
            errors: Vec::new(),
        }
    }

    /// A failed pass; conflicts and counts are discarded
    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            success: false,
            conflicts: Vec::new(),
            synced_items: 0,
            errors,
        }
    }

    /// The offline short-circuit result
    pub fn offline() -> Self {
        Self::failure(vec![crate::SyncError::Offline.to_string()])
    }

    /// Returns true if the pass was skipped because the device is offline
    pub fn is_offline(&self) -> bool {
        !self.success && self.errors.len() == 1 && self.errors[0] == crate::SyncError::Offline.to_string()
    }

    /// Returns true if the pass left conflicts for the caller to look at
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopsync_core::RecordType;

    #[test]
    fn test_offline_result() {
        let result = SyncResult::offline();
        assert!(!result.success);
        assert_eq!(result.errors, vec!["Device is offline".to_string()]);
        assert_eq!(result.synced_items, 0);
        assert!(result.is_offline());
    }

    #[test]
    fn test_failure_is_not_offline() {
        let result = SyncResult::failure(vec!["Network error: boom".to_string()]);
        assert!(!result.is_offline());
    }

    #[test]
    fn test_conflict_record_id() {
        let local = SyncRecord::new(RecordType::Cart, "u1", json!([]), "a", "ios");
        let remote = SyncRecord::new(RecordType::Cart, "u1", json!([]), "b", "web");
        let conflict = SyncConflict::new(local, remote, ConflictType::Device);
        assert_eq!(conflict.record_id(), "cart_u1");
    }

    #[test]
    fn test_result_wire_shape() {
        let value = serde_json::to_value(SyncResult::success(Vec::new(), 3)).unwrap();
        assert_eq!(value["syncedItems"], 3);
        assert_eq!(value["success"], true);
    }
}
