// crates/sync-engine/src/detector.rs
//! Conflict detection

use crate::types::{ConflictType, SyncConflict};
use shopsync_core::SyncRecord;
use std::collections::HashMap;

/// Default tolerance window for timestamp conflicts, in milliseconds
pub const DEFAULT_TOLERANCE_MS: u64 = 1000;

/// Pairwise comparison of local and remote record sets
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    tolerance_ms: u64,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_MS)
    }
}

impl ConflictDetector {
    pub fn new(tolerance_ms: u64) -> Self {
        Self { tolerance_ms }
    }

    pub fn tolerance_ms(&self) -> u64 {
        self.tolerance_ms
    }

    /// Detects conflicts between local and remote records
    ///
    /// Records are paired by id. Each condition that holds for a pair yields
    /// its own entry, in the order timestamp, version, device. Output follows
    /// the order of `local`. Records present on one side only are never
    /// conflicts.
    pub fn detect(&self, local: &[SyncRecord], remote: &[SyncRecord]) -> Vec<SyncConflict> {
        let remote_by_id: HashMap<&str, &SyncRecord> =
            remote.iter().map(|r| (r.id.as_str(), r)).collect();

        let mut conflicts = Vec::new();
        for local_record in local {
            let Some(remote_record) = remote_by_id.get(local_record.id.as_str()) else {
                continue;
            };

            for conflict_type in self.conditions(local_record, remote_record) {
                conflicts.push(SyncConflict::new(
                    local_record.clone(),
                    (*remote_record).clone(),
                    conflict_type,
                ));
            }
        }
        conflicts
    }

    /// Returns every condition that holds for one pair
    pub fn conditions(&self, local: &SyncRecord, remote: &SyncRecord) -> Vec<ConflictType> {
        let mut found = Vec::new();
        if local.timestamp.distance(&remote.timestamp) > self.tolerance_ms {
            found.push(ConflictType::Timestamp);
        }
        if local.version != remote.version {
            found.push(ConflictType::Version);
        }
        if local.device_id != remote.device_id && local.timestamp == remote.timestamp {
            found.push(ConflictType::Device);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopsync_core::RecordType;

    fn record(record_type: RecordType, device: &str, timestamp: i64, version: u64) -> SyncRecord {
        SyncRecord::new(record_type, "u1", json!({}), device, "web")
            .with_timestamp(timestamp)
            .with_version(version)
    }

    #[test]
    fn test_identical_records_do_not_conflict() {
        let a = record(RecordType::Cart, "dev-a", 1000, 1);
        let conflicts = ConflictDetector::default().detect(&[a.clone()], &[a]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_timestamp_within_tolerance() {
        let detector = ConflictDetector::default();
        let local = record(RecordType::Cart, "dev-a", 1000, 1);
        let remote = record(RecordType::Cart, "dev-a", 2000, 1);
        assert!(detector.detect(&[local.clone()], &[remote]).is_empty());

        let remote = record(RecordType::Cart, "dev-a", 2001, 1);
        let conflicts = detector.detect(&[local], &[remote]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Timestamp);
    }

    #[test]
    fn test_multiple_conditions_emit_multiple_entries() {
        let local = record(RecordType::Preferences, "dev-a", 1000, 1);
        let remote = record(RecordType::Preferences, "dev-b", 5000, 2);

        let types: Vec<ConflictType> = ConflictDetector::default()
            .detect(&[local], &[remote])
            .into_iter()
            .map(|c| c.conflict_type)
            .collect();
        assert_eq!(types, vec![ConflictType::Timestamp, ConflictType::Version]);
    }

    #[test]
    fn test_device_conflict_requires_equal_timestamps() {
        let detector = ConflictDetector::default();
        let local = record(RecordType::Wishlist, "dev-a", 1000, 1);
        let same_time = record(RecordType::Wishlist, "dev-b", 1000, 1);
        let near_time = record(RecordType::Wishlist, "dev-b", 1001, 1);

        let conflicts = detector.detect(&[local.clone()], &[same_time]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Device);
        assert!(detector.detect(&[local], &[near_time]).is_empty());
    }

    #[test]
    fn test_unpaired_records_are_ignored() {
        let local = record(RecordType::Cart, "dev-a", 1000, 1);
        let remote = record(RecordType::Wishlist, "dev-b", 9000, 7);
        assert!(ConflictDetector::default()
            .detect(&[local], &[remote])
            .is_empty());
    }

    #[test]
    fn test_zero_tolerance() {
        let detector = ConflictDetector::new(0);
        let local = record(RecordType::Cart, "dev-a", 1000, 1);
        let remote = record(RecordType::Cart, "dev-a", 1001, 1);
        assert_eq!(detector.detect(&[local], &[remote]).len(), 1);
    }
}
