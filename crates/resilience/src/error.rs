// crates/resilience/src/error.rs
//! Error types for resilience policies

use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors that can occur when building resilience policies
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// Policy parameters are inconsistent
    #[error("Invalid retry policy: {0}")]
    InvalidPolicy(String),
}
