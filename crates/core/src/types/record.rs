//! Synchronization records and their closed set of types

use super::common::Timestamp;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of user state carried by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// User preferences (object payload)
    Preferences,
    /// Shopping cart line items
    Cart,
    /// Saved products
    Wishlist,
    /// Swipe/like/skip events
    InteractionHistory,
}

impl RecordType {
    /// Every known record type, in the order a pass reads them
    pub const ALL: [RecordType; 4] = [
        RecordType::Preferences,
        RecordType::Cart,
        RecordType::Wishlist,
        RecordType::InteractionHistory,
    ];

    /// Returns the wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Preferences => "preferences",
            RecordType::Cart => "cart",
            RecordType::Wishlist => "wishlist",
            RecordType::InteractionHistory => "interaction_history",
        }
    }

    /// Local store key for this type: `<type>_<userId>`
    pub fn storage_key(&self, user_id: &str) -> String {
        format!("{}_{}", self.as_str(), user_id)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownRecordType(s.to_string()))
    }
}

/// The unit of synchronization
///
/// One authoritative copy exists per `(user, type)` on each side. A rewrite
/// never mutates a record in place; it produces a successor with a higher
/// version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Stable identifier, unique per (user, type)
    pub id: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Type-dependent payload
    pub payload: serde_json::Value,
    /// Logical write time of the payload
    pub timestamp: Timestamp,
    /// Device that produced this version
    pub device_id: String,
    /// Originating client kind
    pub platform: String,
    /// Monotonically non-decreasing version
    pub version: u64,
}

impl SyncRecord {
    /// Creates the first version of a record for a user
    pub fn new(
        record_type: RecordType,
        user_id: &str,
        payload: serde_json::Value,
        device_id: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::record_id(record_type, user_id),
            record_type,
            payload,
            timestamp: Timestamp::now(),
            device_id: device_id.into(),
            platform: platform.into(),
            version: 1,
        }
    }

    /// Identifier of the record holding `record_type` state for `user_id`
    pub fn record_id(record_type: RecordType, user_id: &str) -> String {
        record_type.storage_key(user_id)
    }

    /// Produces the successor of this record with a new payload
    pub fn supersede(&self, payload: serde_json::Value, device_id: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            record_type: self.record_type,
            payload,
            timestamp: Timestamp::now(),
            device_id: device_id.into(),
            platform: self.platform.clone(),
            version: self.version + 1,
        }
    }

    /// Sets an explicit write time
    pub fn with_timestamp(mut self, timestamp: impl Into<Timestamp>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Sets an explicit version
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Returns true if this record was written after `other`
    pub fn is_newer_than(&self, other: &SyncRecord) -> bool {
        self.timestamp > other.timestamp
    }
}
