// crates/sync-engine/src/resolver.rs
//! Conflict resolution strategies

use crate::merge::merge_records;
use crate::types::SyncConflict;
use serde::{Deserialize, Serialize};
use shopsync_core::{ResolutionStrategy, SyncRecord, Timestamp};
use std::collections::HashSet;

/// Produces one winning record per conflicting id
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    strategy: ResolutionStrategy,
}

impl ConflictResolver {
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Resolves every conflict, collapsing entries that share an id
    ///
    /// The detector can flag one pair several times (once per condition);
    /// each id is resolved exactly once, in first-seen order.
    pub fn resolve(&self, conflicts: &[SyncConflict]) -> Vec<SyncRecord> {
        let mut seen = HashSet::new();
        conflicts
            .iter()
            .filter(|c| seen.insert(c.record_id()))
            .map(|c| self.resolve_pair(&c.local, &c.remote))
            .collect()
    }

    /// Resolves a single local/remote pair
    pub fn resolve_pair(&self, local: &SyncRecord, remote: &SyncRecord) -> SyncRecord {
        match self.strategy {
            ResolutionStrategy::LatestWins => {
                if remote.timestamp > local.timestamp {
                    remote.clone()
                } else {
                    local.clone()
                }
            }
            ResolutionStrategy::Merge => merge_records(local, remote),
            ResolutionStrategy::Manual => local.clone(),
        }
    }
}

/// Caller's decision for a conflict left open by the manual strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualResolution {
    KeepLocal,
    KeepRemote,
    Merge,
}

impl ManualResolution {
    /// Builds the record to write for this decision
    ///
    /// The result always supersedes both copies.
    pub fn apply(&self, conflict: &SyncConflict) -> SyncRecord {
        let local = &conflict.local;
        let remote = &conflict.remote;
        let chosen = match self {
            ManualResolution::KeepLocal => local.clone(),
            ManualResolution::KeepRemote => remote.clone(),
            ManualResolution::Merge => return merge_records(local, remote),
        };

        SyncRecord {
            timestamp: Timestamp::now(),
            version: local.version.max(remote.version) + 1,
            ..chosen
        }
    }
}
