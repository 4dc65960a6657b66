//! Typed views over record payloads
//!
//! Payloads travel as opaque JSON. These views are what the mergers work
//! with; fields they do not know about are carried through untouched.

use super::common::Timestamp;
use super::record::RecordType;
use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Preferences payload: a flat JSON object
pub type Preferences = Map<String, Value>;

/// A cart line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_quantity() -> u32 {
    1
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            extra: Map::new(),
        }
    }
}

/// A saved product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WishlistEntry {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            extra: Map::new(),
        }
    }
}

/// A single swipe/like/skip event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub product_id: String,
    pub timestamp: Timestamp,
    /// `like`, `dislike`, `skip`, `super_like`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InteractionEvent {
    pub fn new(product_id: impl Into<String>, timestamp: impl Into<Timestamp>) -> Self {
        Self {
            product_id: product_id.into(),
            timestamp: timestamp.into(),
            action: None,
            extra: Map::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Identity used for de-duplication
    pub fn key(&self) -> (&str, Timestamp) {
        (&self.product_id, self.timestamp)
    }
}

/// Decodes a list payload; `null` is treated as an empty list
pub fn decode_list<T: DeserializeOwned>(record_type: RecordType, payload: &Value) -> Result<Vec<T>> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(payload.clone()).map_err(|e| {
            CoreError::InvalidPayload {
                record_type,
                reason: e.to_string(),
            }
        }),
        other => Err(CoreError::InvalidPayload {
            record_type,
            reason: format!("expected an array, got {}", json_kind(other)),
        }),
    }
}

/// Decodes a preferences payload; `null` is treated as an empty object
pub fn decode_preferences(payload: &Value) -> Result<Preferences> {
    match payload {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        other => Err(CoreError::InvalidPayload {
            record_type: RecordType::Preferences,
            reason: format!("expected an object, got {}", json_kind(other)),
        }),
    }
}

/// Encodes a typed list back into a payload
pub fn encode_list<T: Serialize>(items: &[T]) -> Result<Value> {
    Ok(serde_json::to_value(items)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cart_item_keeps_unknown_fields() {
        let payload = json!([{"productId": "p1", "quantity": 2, "size": "M"}]);
        let items: Vec<CartItem> = decode_list(RecordType::Cart, &payload).unwrap();

        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].extra["size"], "M");
        assert_eq!(encode_list(&items).unwrap(), payload);
    }

    #[test]
    fn test_cart_item_quantity_defaults_to_one() {
        let items: Vec<CartItem> =
            decode_list(RecordType::Cart, &json!([{"productId": "p1"}])).unwrap();
        assert_eq!(items[0].quantity, 1);
    }

    #[test]
    fn test_null_payload_is_empty() {
        let items: Vec<WishlistEntry> = decode_list(RecordType::Wishlist, &Value::Null).unwrap();
        assert!(items.is_empty());
        assert!(decode_preferences(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let err = decode_list::<CartItem>(RecordType::Cart, &json!({"p1": 2})).unwrap_err();
        assert!(err.to_string().contains("expected an array"));

        let err = decode_preferences(&json!(["a"])).unwrap_err();
        assert!(err.to_string().contains("preferences"));
    }

    #[test]
    fn test_interaction_event_action_is_optional() {
        let events: Vec<InteractionEvent> = decode_list(
            RecordType::InteractionHistory,
            &json!([{"productId": "p1", "timestamp": 10}, {"productId": "p2", "timestamp": 20, "action": "like"}]),
        )
        .unwrap();

        assert_eq!(events[0].action, None);
        assert_eq!(events[1].action.as_deref(), Some("like"));
        assert_eq!(events[1].key(), ("p2", Timestamp::from_millis(20)));
    }
}
