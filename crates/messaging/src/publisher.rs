//! Publishing abstraction shared by the transport adapters.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use common::EventId;
use contracts::EventEnvelope;
use serde::Serialize;

use crate::codec::EventCodec;
use crate::error::Result;

/// An envelope serialized once and ready to hand to any transport.
///
/// Packing up front keeps the publisher trait object-safe: the generic
/// payload type is erased into bytes here, together with the transport
/// metadata every adapter attaches as headers.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub event_id: EventId,
    pub event_type: String,
    pub version: i32,
    pub occurred_at: DateTime<FixedOffset>,
    pub correlation_id: String,
    pub partition_key: String,
    pub payload_format: &'static str,
    pub body: Vec<u8>,
}

impl OutboundEvent {
    /// Serializes an envelope with the given codec.
    pub fn pack<P: Serialize>(envelope: &EventEnvelope<P>, codec: EventCodec) -> Result<Self> {
        Ok(Self {
            event_id: envelope.event_id,
            event_type: envelope.event_type.clone(),
            version: envelope.version,
            occurred_at: envelope.occurred_at,
            correlation_id: envelope.correlation_id.clone(),
            partition_key: envelope.partition_key.clone(),
            payload_format: codec.format(),
            body: codec.serialize(envelope)?,
        })
    }
}

/// Sends packed envelopes to the broker with transport metadata headers.
///
/// Durability and retry of transient errors are the transport's business
/// (all-replica acks, idempotent producer); what surfaces here is either
/// success or a non-retryable failure.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes a single event.
    async fn publish(&self, event: OutboundEvent) -> Result<()>;

    /// Publishes a batch sequentially.
    ///
    /// There is no cross-message atomicity: the first failure aborts the
    /// remainder, leaving a prefix already sent. The error surfaces so the
    /// caller can decide whether to re-submit the rest.
    async fn publish_batch(&self, events: Vec<OutboundEvent>) -> Result<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ORDER_CREATED, OrderCreatedV1};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn pack_captures_metadata_and_serializes_body() {
        let payload = OrderCreatedV1 {
            order_id: "order-1".to_string(),
            customer_id: "acme".to_string(),
            amount: Decimal::from_str("10.00").unwrap(),
            currency: "USD".to_string(),
            created_at: chrono::Utc::now().fixed_offset(),
            created_by: "api".to_string(),
        };
        let envelope =
            EventEnvelope::create(ORDER_CREATED, 1, "acme", payload, Some("c-1".to_string()));

        let packed = OutboundEvent::pack(&envelope, EventCodec::Json).unwrap();
        assert_eq!(packed.event_id, envelope.event_id);
        assert_eq!(packed.event_type, ORDER_CREATED);
        assert_eq!(packed.version, 1);
        assert_eq!(packed.partition_key, "acme");
        assert_eq!(packed.payload_format, "json");
        assert!(!packed.body.is_empty());
    }
}
