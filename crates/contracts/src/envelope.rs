//! Versioned event envelope.

use chrono::{DateTime, FixedOffset, Utc};
use common::EventId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping a versioned payload with transport metadata.
///
/// `event_id` is globally unique per logical event instance and serves as
/// the idempotency key downstream. `version` selects which payload schema
/// decodes `payload`; `event_type` is the stable logical name and does not
/// change across versions. Envelopes are immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<P> {
    pub event_id: EventId,
    pub event_type: String,
    pub version: i32,
    pub occurred_at: DateTime<FixedOffset>,
    pub correlation_id: String,
    pub partition_key: String,
    pub payload: P,
}

impl<P> EventEnvelope<P> {
    /// Creates an envelope with a fresh event ID and the current timestamp.
    ///
    /// When `correlation_id` is `None` a fresh one is generated, so command
    /// flows always produce a traceable envelope.
    pub fn create(
        event_type: impl Into<String>,
        version: i32,
        partition_key: impl Into<String>,
        payload: P,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            version,
            occurred_at: Utc::now().fixed_offset(),
            correlation_id: correlation_id
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            partition_key: partition_key.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ORDER_CREATED;

    #[test]
    fn create_generates_unique_ids() {
        let a = EventEnvelope::create(ORDER_CREATED, 1, "acme", (), None);
        let b = EventEnvelope::create(ORDER_CREATED, 1, "acme", (), None);
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn create_generates_correlation_id_when_absent() {
        let envelope = EventEnvelope::create(ORDER_CREATED, 1, "acme", (), None);
        assert!(!envelope.correlation_id.is_empty());
    }

    #[test]
    fn create_keeps_caller_correlation_id() {
        let envelope =
            EventEnvelope::create(ORDER_CREATED, 2, "acme", (), Some("corr-7".to_string()));
        assert_eq!(envelope.correlation_id, "corr-7");
        assert_eq!(envelope.version, 2);
        assert_eq!(envelope.partition_key, "acme");
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let envelope = EventEnvelope::create(ORDER_CREATED, 1, "acme", 42u32, None);
        let json = serde_json::to_value(&envelope).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "eventId",
            "eventType",
            "version",
            "occurredAt",
            "correlationId",
            "partitionKey",
            "payload",
        ] {
            assert!(obj.contains_key(key), "missing wire field {key}");
        }
    }
}
