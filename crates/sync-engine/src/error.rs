// crates/sync-engine/src/error.rs
//! Error types for sync operations

use shopsync_core::CoreError;
use thiserror::Error;

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur during synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// Pass aborted before any I/O because the device is offline
    #[error("Device is offline")]
    Offline,

    /// A pass for the same user is already running
    #[error("Sync already in progress")]
    SyncInProgress,

    /// Remote gateway failure
    #[error("Network error: {0}")]
    Network(String),

    /// Local store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Caller passed something unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record or payload could not be interpreted
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl SyncError {
    /// Returns true if a later pass may succeed without intervention
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Offline
                | SyncError::SyncInProgress
                | SyncError::Network(_)
                | SyncError::Storage(_)
                | SyncError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_message() {
        assert_eq!(SyncError::Offline.to_string(), "Device is offline");
    }

    #[test]
    fn test_in_progress_message() {
        assert!(SyncError::SyncInProgress
            .to_string()
            .contains("already in progress"));
    }

    #[test]
    fn test_network_error_display() {
        let err = SyncError::Network("connection reset".to_string());
        assert_eq!(err.to_string(), "Network error: connection reset");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::Network("timeout".to_string()).is_retryable());
        assert!(SyncError::Storage("disk full".to_string()).is_retryable());
        assert!(!SyncError::InvalidInput("empty user".to_string()).is_retryable());
        assert!(!SyncError::Core(CoreError::UnknownRecordType("x".to_string())).is_retryable());
    }
}
