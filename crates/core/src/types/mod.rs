//! Domain types for ShopSync
//!
//! - `record`: synchronization records and record types
//! - `payload`: typed views over cart, wishlist, interaction and preference payloads
//! - `strategy`: conflict resolution strategies
//! - `common`: timestamps

mod common;
mod payload;
mod record;
mod strategy;

pub use common::Timestamp;
pub use payload::{
    decode_list, decode_preferences, encode_list, CartItem, InteractionEvent, Preferences,
    WishlistEntry,
};
pub use record::{RecordType, SyncRecord};
pub use strategy::ResolutionStrategy;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_types_are_exported() {
        let _ = Timestamp::now();
        let _ = ResolutionStrategy::default();
        let _ = CartItem::new("p1", 1);
        let _ = WishlistEntry::new("p1");
        let _ = InteractionEvent::new("p1", 10);
        assert_eq!(RecordType::ALL.len(), 4);
    }
}
