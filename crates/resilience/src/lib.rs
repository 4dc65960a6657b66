// crates/resilience/src/lib.rs
//! Resilience patterns for the sync driver
//!
//! Failed sync passes are not retried inside the engine; the driver spaces
//! its next attempt using the exponential backoff defined here.
//!
//! # Example
//!
//! ```rust
//! use shopsync_resilience::{Backoff, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(Duration::from_millis(500))
//!     .with_max_delay(Duration::from_secs(60));
//! let mut backoff = Backoff::new(policy);
//!
//! let delay = backoff.record_failure();
//! assert!(delay <= Duration::from_millis(500));
//! ```

mod error;
mod retry;

pub use error::{ResilienceError, ResilienceResult};
pub use retry::{Backoff, RetryPolicy};
