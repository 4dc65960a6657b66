// crates/sync-engine/src/lib.rs
//! Offline-first synchronization engine
//!
//! Reconciles a user's preferences, cart, wishlist and interaction history
//! between a local store and a remote service:
//! - Conflict detection by record id
//! - Latest-wins, type-aware merge and manual resolution strategies
//! - A durable pending-write queue for offline periods
//! - A driver that serializes manual, periodic and lifecycle triggers
//!
//! # Example
//!
//! ```rust
//! use shopsync_core::{RecordType, ResolutionStrategy};
//! use shopsync_sync_engine::{EngineSettings, MemoryGateway, MemoryStore, SyncEngine};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(MemoryGateway::new());
//! let engine = SyncEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     gateway.clone(),
//!     EngineSettings::default(),
//! );
//! engine.set_conflict_resolution_strategy(ResolutionStrategy::Merge)?;
//!
//! engine
//!     .write_local("user-1", RecordType::Wishlist, serde_json::json!([{"productId": "p1"}]))
//!     .await?;
//!
//! let result = engine.sync_user_data("user-1").await;
//! assert!(result.success);
//! assert_eq!(result.synced_items, 1);
//! # Ok(())
//! # }
//! ```

mod cache;
mod detector;
mod device;
mod driver;
mod engine;
mod error;
mod gateway;
pub mod merge;
mod queue;
mod resolver;
mod store;
mod types;

pub use cache::{CacheInfo, MemoryOfflineCache, OfflineCache};
pub use detector::{ConflictDetector, DEFAULT_TOLERANCE_MS};
pub use device::{DeviceIdentity, DEVICE_ID_KEY};
pub use driver::{DriverSettings, SyncDriver, SyncState, SyncStatus};
pub use engine::{outbox_key, EngineSettings, SyncEngine};
pub use error::{Result, SyncError};
pub use gateway::{MemoryGateway, RemoteGateway};
pub use queue::{QueuedWrite, SyncQueue, QUEUE_KEY};
pub use resolver::{ConflictResolver, ManualResolution};
pub use store::{FileStore, LocalStore, MemoryStore};
pub use types::{ConflictType, SyncConflict, SyncResult};
