//! Error types for the shared domain model

use crate::types::RecordType;
use thiserror::Error;

/// Result type alias using the core error
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while interpreting records and payloads
#[derive(Error, Debug)]
pub enum CoreError {
    /// Payload does not have the shape its record type requires
    #[error("Invalid {record_type} payload: {reason}")]
    InvalidPayload {
        record_type: RecordType,
        reason: String,
    },

    /// Record type name outside the known set
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// Resolution strategy name outside the known set
    #[error("Unknown resolution strategy: {0}")]
    UnknownStrategy(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
