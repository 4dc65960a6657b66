// crates/sync-engine/src/cache.rs
//! Offline cache collaborator

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shopsync_core::{CartItem, InteractionEvent, WishlistEntry};
use std::sync::Mutex;

/// Snapshot of what the offline cache holds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub products: usize,
    pub has_user_data: bool,
    pub pending_cart: usize,
    pub pending_wishlist: usize,
    pub pending_swipes: usize,
    pub offline_mode: bool,
}

/// Read-through cache used while the device is offline
///
/// The engine only drives `set_offline_mode`; the caching policy belongs to
/// the implementation.
#[async_trait]
pub trait OfflineCache: Send + Sync {
    async fn add_to_offline_cart(&self, item: CartItem) -> Result<()>;

    async fn add_to_offline_wishlist(&self, entry: WishlistEntry) -> Result<()>;

    async fn record_offline_swipe(&self, event: InteractionEvent) -> Result<()>;

    async fn get_cached_products(&self) -> Result<Vec<Value>>;

    async fn get_cached_user_data(&self) -> Result<Option<Value>>;

    async fn get_cache_info(&self) -> Result<CacheInfo>;

    async fn clear_cache(&self) -> Result<()>;

    async fn set_offline_mode(&self, offline: bool) -> Result<()>;
}

#[derive(Debug, Default)]
struct CacheState {
    products: Vec<Value>,
    user_data: Option<Value>,
    cart: Vec<CartItem>,
    wishlist: Vec<WishlistEntry>,
    swipes: Vec<InteractionEvent>,
    offline_mode: bool,
}

/// In-memory offline cache
#[derive(Debug, Default)]
pub struct MemoryOfflineCache {
    state: Mutex<CacheState>,
}

impl MemoryOfflineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached product list
    pub fn cache_products(&self, products: Vec<Value>) -> Result<()> {
        self.with_state(|state| state.products = products)
    }

    /// Replaces the cached user data
    pub fn cache_user_data(&self, user_data: Value) -> Result<()> {
        self.with_state(|state| state.user_data = Some(user_data))
    }

    /// Returns true if the cache currently believes the device is offline
    pub fn is_offline(&self) -> Result<bool> {
        self.with_state(|state| state.offline_mode)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut CacheState) -> T) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))?;
        Ok(f(&mut state))
    }
}

#[async_trait]
impl OfflineCache for MemoryOfflineCache {
    async fn add_to_offline_cart(&self, item: CartItem) -> Result<()> {
        self.with_state(|state| {
            match state
                .cart
                .iter_mut()
                .find(|existing| existing.product_id == item.product_id)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity)
                }
                None => state.cart.push(item),
            }
        })
    }

    async fn add_to_offline_wishlist(&self, entry: WishlistEntry) -> Result<()> {
        self.with_state(|state| {
            if !state
                .wishlist
                .iter()
                .any(|existing| existing.product_id == entry.product_id)
            {
                state.wishlist.push(entry);
            }
        })
    }

    async fn record_offline_swipe(&self, event: InteractionEvent) -> Result<()> {
        self.with_state(|state| state.swipes.push(event))
    }

    async fn get_cached_products(&self) -> Result<Vec<Value>> {
        self.with_state(|state| state.products.clone())
    }

    async fn get_cached_user_data(&self) -> Result<Option<Value>> {
        self.with_state(|state| state.user_data.clone())
    }

    async fn get_cache_info(&self) -> Result<CacheInfo> {
        self.with_state(|state| CacheInfo {
            products: state.products.len(),
            has_user_data: state.user_data.is_some(),
            pending_cart: state.cart.len(),
            pending_wishlist: state.wishlist.len(),
            pending_swipes: state.swipes.len(),
            offline_mode: state.offline_mode,
        })
    }

    async fn clear_cache(&self) -> Result<()> {
        self.with_state(|state| {
            let offline_mode = state.offline_mode;
            *state = CacheState {
                offline_mode,
                ..CacheState::default()
            };
        })
    }

    async fn set_offline_mode(&self, offline: bool) -> Result<()> {
        self.with_state(|state| state.offline_mode = offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_offline_cart_accumulates_quantity() {
        let cache = MemoryOfflineCache::new();
        cache.add_to_offline_cart(CartItem::new("p1", 1)).await.unwrap();
        cache.add_to_offline_cart(CartItem::new("p1", 2)).await.unwrap();
        cache.add_to_offline_cart(CartItem::new("p2", 1)).await.unwrap();

        let info = cache.get_cache_info().await.unwrap();
        assert_eq!(info.pending_cart, 2);
    }

    #[tokio::test]
    async fn test_offline_cart_quantity_saturates() {
        let cache = MemoryOfflineCache::new();
        cache
            .add_to_offline_cart(CartItem::new("p1", u32::MAX - 1))
            .await
            .unwrap();
        cache.add_to_offline_cart(CartItem::new("p1", 5)).await.unwrap();

        let quantity = cache.with_state(|state| state.cart[0].quantity).unwrap();
        assert_eq!(quantity, u32::MAX);
    }

    #[tokio::test]
    async fn test_wishlist_and_swipes() {
        let cache = MemoryOfflineCache::new();
        cache.add_to_offline_wishlist(WishlistEntry::new("p1")).await.unwrap();
        cache.add_to_offline_wishlist(WishlistEntry::new("p1")).await.unwrap();
        cache
            .record_offline_swipe(InteractionEvent::new("p1", 10).with_action("like"))
            .await
            .unwrap();

        let info = cache.get_cache_info().await.unwrap();
        assert_eq!(info.pending_wishlist, 1);
        assert_eq!(info.pending_swipes, 1);
    }

    #[tokio::test]
    async fn test_clear_keeps_offline_mode() {
        let cache = MemoryOfflineCache::new();
        cache.cache_products(vec![json!({"id": "p1"})]).unwrap();
        cache.cache_user_data(json!({"name": "Ada"})).unwrap();
        cache.set_offline_mode(true).await.unwrap();

        assert_eq!(cache.get_cached_products().await.unwrap().len(), 1);
        assert!(cache.get_cached_user_data().await.unwrap().is_some());

        cache.clear_cache().await.unwrap();
        assert_eq!(
            cache.get_cache_info().await.unwrap(),
            CacheInfo {
                offline_mode: true,
                ..CacheInfo::default()
            }
        );
    }
}
