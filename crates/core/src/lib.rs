//! Shared domain model for the ShopSync synchronization engine
//!
//! Records, record types, payload views and the resolution strategy enum
//! used by both the engine and its configuration layer.

pub mod error;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{
    CartItem, InteractionEvent, Preferences, RecordType, ResolutionStrategy, SyncRecord, Timestamp,
    WishlistEntry,
};
