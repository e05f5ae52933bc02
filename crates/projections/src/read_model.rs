//! Persisted read model rows.

use chrono::{DateTime, Utc};
use common::EventId;
use rust_decimal::Decimal;

/// Denormalized order row served by the query endpoints.
///
/// Created on the first applied event for an order and mutated in place by
/// every later applied event — last writer wins by delivery order, not by
/// event timestamp. Rows are only removed by an administrative reset.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderProjection {
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

/// Idempotency ledger row.
///
/// Inserted atomically with the projection mutation it guards; never
/// updated. Its existence means the mutation for this event id is already
/// durable, so later deliveries of the same event become no-ops.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedEventMarker {
    pub event_id: EventId,
    pub event_type: String,
    pub version: i32,
    pub partition_id: String,
    pub offset: Option<i64>,
    pub processed_at: DateTime<Utc>,
}
