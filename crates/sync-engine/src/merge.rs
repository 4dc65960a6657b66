// crates/sync-engine/src/merge.rs
//! Type-specific record mergers
//!
//! Every merger is total: a payload that does not decode into the expected
//! shape makes the merge fall back to the copy with the higher version
//! (local on a tie) instead of failing.

use shopsync_core::types::{
    decode_list, decode_preferences, encode_list, CartItem, InteractionEvent, WishlistEntry,
};
use shopsync_core::{RecordType, SyncRecord, Timestamp};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Merges two copies of the same record into a successor of both
///
/// The result keeps the local id, device and platform, is stamped with the
/// current time, and has `version = max(local, remote) + 1`.
pub fn merge_records(local: &SyncRecord, remote: &SyncRecord) -> SyncRecord {
    let payload = if local.record_type != remote.record_type {
        log::warn!(
            "Type mismatch merging {} ({} vs {}), keeping higher version",
            local.id,
            local.record_type,
            remote.record_type
        );
        None
    } else {
        let merged = match local.record_type {
            RecordType::Preferences => merge_preferences(&local.payload, &remote.payload),
            RecordType::Cart => merge_cart(&local.payload, &remote.payload),
            RecordType::Wishlist => merge_wishlist(&local.payload, &remote.payload),
            RecordType::InteractionHistory => {
                merge_interactions(&local.payload, &remote.payload)
            }
        };
        match merged {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!("Cannot merge {}: {}, keeping higher version", local.id, e);
                None
            }
        }
    };

    let payload = payload.unwrap_or_else(|| {
        if remote.version > local.version {
            remote.payload.clone()
        } else {
            local.payload.clone()
        }
    });

    SyncRecord {
        id: local.id.clone(),
        record_type: local.record_type,
        payload,
        timestamp: Timestamp::now(),
        device_id: local.device_id.clone(),
        platform: local.platform.clone(),
        version: local.version.max(remote.version) + 1,
    }
}

/// Shallow merge with remote as the base and local fields overlaid
pub fn merge_preferences(local: &Value, remote: &Value) -> shopsync_core::Result<Value> {
    let mut merged = decode_preferences(remote)?;
    for (key, value) in decode_preferences(local)? {
        merged.insert(key, value);
    }
    Ok(Value::Object(merged))
}

/// Union of line items by product; duplicates keep the larger quantity
///
/// Local items come first in their own order, then remote-only items. On a
/// quantity tie the local entry is kept.
pub fn merge_cart(local: &Value, remote: &Value) -> shopsync_core::Result<Value> {
    let local: Vec<CartItem> = decode_list(RecordType::Cart, local)?;
    let remote: Vec<CartItem> = decode_list(RecordType::Cart, remote)?;

    let mut position: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<CartItem> = Vec::with_capacity(local.len() + remote.len());
    for item in local.into_iter().chain(remote) {
        match position.get(&item.product_id) {
            Some(&i) => {
                if item.quantity > merged[i].quantity {
                    merged[i] = item;
                }
            }
            None => {
                position.insert(item.product_id.clone(), merged.len());
                merged.push(item);
            }
        }
    }
    encode_list(&merged)
}

/// Union of entries by product, first occurrence kept
pub fn merge_wishlist(local: &Value, remote: &Value) -> shopsync_core::Result<Value> {
    let local: Vec<WishlistEntry> = decode_list(RecordType::Wishlist, local)?;
    let remote: Vec<WishlistEntry> = decode_list(RecordType::Wishlist, remote)?;

    let mut seen = HashSet::new();
    let merged: Vec<WishlistEntry> = local
        .into_iter()
        .chain(remote)
        .filter(|entry| seen.insert(entry.product_id.clone()))
        .collect();
    encode_list(&merged)
}

/// Union of events by `(product, timestamp)`, newest first
pub fn merge_interactions(local: &Value, remote: &Value) -> shopsync_core::Result<Value> {
    let local: Vec<InteractionEvent> = decode_list(RecordType::InteractionHistory, local)?;
    let remote: Vec<InteractionEvent> = decode_list(RecordType::InteractionHistory, remote)?;

    let mut seen = HashSet::new();
    let mut merged: Vec<InteractionEvent> = local
        .into_iter()
        .chain(remote)
        .filter(|event| seen.insert((event.product_id.clone(), event.timestamp)))
        .collect();
    // stable: equal timestamps keep local-before-remote order
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    encode_list(&merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(record_type: RecordType, payload: Value, version: u64) -> SyncRecord {
        SyncRecord::new(record_type, "u1", payload, "dev-a", "ios").with_version(version)
    }

    #[test]
    fn test_preferences_local_overlay_wins() {
        let merged = merge_preferences(
            &json!({"theme": "dark", "categories": ["a"]}),
            &json!({"categories": ["b"], "currency": "EUR"}),
        )
        .unwrap();
        assert_eq!(
            merged,
            json!({"theme": "dark", "categories": ["a"], "currency": "EUR"})
        );
    }

    #[test]
    fn test_cart_keeps_larger_quantity_in_either_order() {
        let two = json!([{"productId": "p1", "quantity": 2}]);
        let five = json!([{"productId": "p1", "quantity": 5}]);
        let expected = json!([{"productId": "p1", "quantity": 5}]);

        assert_eq!(merge_cart(&two, &five).unwrap(), expected);
        assert_eq!(merge_cart(&five, &two).unwrap(), expected);
    }

    #[test]
    fn test_cart_carries_unique_items_unchanged() {
        let merged = merge_cart(
            &json!([{"productId": "p1", "quantity": 1, "size": "M"}]),
            &json!([{"productId": "p2", "quantity": 3}]),
        )
        .unwrap();
        assert_eq!(
            merged,
            json!([
                {"productId": "p1", "quantity": 1, "size": "M"},
                {"productId": "p2", "quantity": 3}
            ])
        );
    }

    #[test]
    fn test_cart_quantity_tie_keeps_local() {
        let merged = merge_cart(
            &json!([{"productId": "p1", "quantity": 2, "note": "local"}]),
            &json!([{"productId": "p1", "quantity": 2, "note": "remote"}]),
        )
        .unwrap();
        assert_eq!(merged[0]["note"], "local");
    }

    #[test]
    fn test_wishlist_union_without_duplicates() {
        let merged = merge_wishlist(
            &json!([{"productId": "p1"}, {"productId": "p2"}]),
            &json!([{"productId": "p2"}, {"productId": "p3"}]),
        )
        .unwrap();
        assert_eq!(
            merged,
            json!([{"productId": "p1"}, {"productId": "p2"}, {"productId": "p3"}])
        );
    }

    #[test]
    fn test_interactions_deduped_and_sorted_descending() {
        let merged = merge_interactions(
            &json!([{"productId": "p1", "timestamp": 10}]),
            &json!([{"productId": "p1", "timestamp": 10}, {"productId": "p2", "timestamp": 20}]),
        )
        .unwrap();
        assert_eq!(
            merged,
            json!([{"productId": "p2", "timestamp": 20}, {"productId": "p1", "timestamp": 10}])
        );
    }

    #[test]
    fn test_same_product_different_times_are_distinct_events() {
        let merged = merge_interactions(
            &json!([{"productId": "p1", "timestamp": 10, "action": "skip"}]),
            &json!([{"productId": "p1", "timestamp": 30, "action": "like"}]),
        )
        .unwrap();
        assert_eq!(merged.as_array().unwrap().len(), 2);
        assert_eq!(merged[0]["action"], "like");
    }

    #[test]
    fn test_merge_records_bumps_version() {
        let local = record(RecordType::Wishlist, json!([{"productId": "p1"}]), 4);
        let remote = record(RecordType::Wishlist, json!([{"productId": "p2"}]), 7);

        let merged = merge_records(&local, &remote);
        assert_eq!(merged.version, 8);
        assert_eq!(merged.id, local.id);
        assert_eq!(merged.device_id, "dev-a");
        assert_eq!(merged.payload.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_merge_bumps_version_even_when_payload_unchanged() {
        let local = record(RecordType::Cart, json!([{"productId": "p1", "quantity": 5}]), 2);
        let remote = record(RecordType::Cart, json!([{"productId": "p1", "quantity": 1}]), 2);

        let merged = merge_records(&local, &remote);
        assert_eq!(merged.payload, local.payload);
        assert_eq!(merged.version, 3);
    }

    #[test]
    fn test_malformed_payload_keeps_higher_version() {
        let local = record(RecordType::Cart, json!({"oops": true}), 3);
        let remote = record(RecordType::Cart, json!([{"productId": "p1", "quantity": 1}]), 5);

        let merged = merge_records(&local, &remote);
        assert_eq!(merged.payload, remote.payload);
        assert_eq!(merged.version, 6);
    }

    #[test]
    fn test_malformed_payload_tie_keeps_local() {
        let local = record(RecordType::Preferences, json!("dark"), 2);
        let remote = record(RecordType::Preferences, json!({"theme": "light"}), 2);

        let merged = merge_records(&local, &remote);
        assert_eq!(merged.payload, json!("dark"));
        assert_eq!(merged.version, 3);
    }
}
