//! Request/response DTOs for the HTTP command and query endpoints.

use chrono::{DateTime, Utc};
use common::EventId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Command payload for publishing a single order-created event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    pub customer_id: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub use_v2: bool,
    #[serde(default)]
    pub source_system: Option<String>,
}

/// Command payload for publishing multiple orders in one call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrdersBulkRequest {
    pub orders: Vec<CreateOrderRequest>,
}

/// Response with the published event's metadata, used for tracing and demos.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOrderResponse {
    pub order_id: String,
    pub event_id: EventId,
    pub event_type: String,
    pub version: i32,
    pub partition_key: String,
    pub payload_format: String,
}

/// Query response for the denormalized order read model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReadModelResponse {
    pub order_id: String,
    pub customer_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_system: Option<String>,
    pub last_event_version: i32,
    pub last_event_id: EventId,
}

