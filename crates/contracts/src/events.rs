//! Versioned payload schemas for order events.
//!
//! Payload types are named by `(event type, version)`. Newer versions only
//! add fields; consumers decode by the version carried in transport
//! metadata, so older producers keep working untouched.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stable logical name for order-created events, shared by all versions.
pub const ORDER_CREATED: &str = "order.created";

/// Initial order-created payload schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedV1 {
    pub order_id: String,
    pub customer_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<FixedOffset>,
    pub created_by: String,
}

/// Evolved order-created payload with source-system and free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedV2 {
    pub order_id: String,
    pub customer_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<FixedOffset>,
    pub created_by: String,
    pub source_system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_v2() -> OrderCreatedV2 {
        OrderCreatedV2 {
            order_id: "order-1".to_string(),
            customer_id: "acme".to_string(),
            amount: Decimal::from_str("100.50").unwrap(),
            currency: "USD".to_string(),
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:30:00+02:00").unwrap(),
            created_by: "api".to_string(),
            source_system: "erp".to_string(),
            attributes: Some(HashMap::from([("channel".to_string(), "web".to_string())])),
        }
    }

    #[test]
    fn amount_serializes_as_exact_decimal_text() {
        let payload = sample_v2();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["amount"], serde_json::json!("100.50"));
    }

    #[test]
    fn created_at_keeps_timezone_offset() {
        let payload = sample_v2();
        let json = serde_json::to_string(&payload).unwrap();
        let back: OrderCreatedV2 = serde_json::from_str(&json).unwrap();
        assert_eq!(back.created_at, payload.created_at);
        assert_eq!(back.created_at.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn v2_attributes_are_optional_on_the_wire() {
        let json = r#"{
            "orderId": "order-1",
            "customerId": "acme",
            "amount": "10",
            "currency": "EUR",
            "createdAt": "2024-05-01T10:30:00Z",
            "createdBy": "api",
            "sourceSystem": "erp"
        }"#;
        let payload: OrderCreatedV2 = serde_json::from_str(json).unwrap();
        assert!(payload.attributes.is_none());
    }

    #[test]
    fn v1_roundtrip_preserves_every_field() {
        let payload = OrderCreatedV1 {
            order_id: "order-9".to_string(),
            customer_id: "globex".to_string(),
            amount: Decimal::from_str("0.01").unwrap(),
            currency: "EUR".to_string(),
            created_at: DateTime::parse_from_rfc3339("2024-01-15T08:00:00-05:00").unwrap(),
            created_by: "api".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: OrderCreatedV1 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
