//! Byte codecs for event envelopes and the format registry resolving them.

use chrono::DateTime;
use common::EventId;
use contracts::EventEnvelope;
use prost::Message;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{MessagingError, Result};

/// Wire format name of the JSON codec.
pub const FORMAT_JSON: &str = "json";
/// Wire format name of the binary codec.
pub const FORMAT_BINARY: &str = "binary";

/// Fixed binary envelope record.
///
/// The envelope schema is rigid; the payload travels inside it as an
/// embedded JSON string, so payload schemas can evolve without touching the
/// binary layout.
#[derive(Clone, PartialEq, Message)]
struct EnvelopeRecord {
    #[prost(string, tag = "1")]
    event_id: String,
    #[prost(string, tag = "2")]
    event_type: String,
    #[prost(int32, tag = "3")]
    version: i32,
    #[prost(string, tag = "4")]
    occurred_at: String,
    #[prost(string, tag = "5")]
    correlation_id: String,
    #[prost(string, tag = "6")]
    partition_key: String,
    #[prost(string, tag = "7")]
    payload_json: String,
}

/// A registered envelope codec, selected by format name.
///
/// Modeled as a tagged variant rather than a trait object: the set of wire
/// formats is closed and small, and the serialize/deserialize methods need
/// to stay generic over the payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCodec {
    /// Human-debuggable JSON with natively typed payload fields.
    Json,
    /// Compact prost-encoded record with the payload as embedded JSON text.
    Binary,
}

impl EventCodec {
    /// Returns the wire format name carried in the `payload-format` header.
    pub fn format(&self) -> &'static str {
        match self {
            EventCodec::Json => FORMAT_JSON,
            EventCodec::Binary => FORMAT_BINARY,
        }
    }

    /// Serializes an envelope to bytes.
    pub fn serialize<P: Serialize>(&self, envelope: &EventEnvelope<P>) -> Result<Vec<u8>> {
        match self {
            EventCodec::Json => Ok(serde_json::to_vec(envelope)?),
            EventCodec::Binary => {
                let record = EnvelopeRecord {
                    event_id: envelope.event_id.to_string(),
                    event_type: envelope.event_type.clone(),
                    version: envelope.version,
                    occurred_at: envelope.occurred_at.to_rfc3339(),
                    correlation_id: envelope.correlation_id.clone(),
                    partition_key: envelope.partition_key.clone(),
                    payload_json: serde_json::to_string(&envelope.payload)?,
                };
                Ok(record.encode_to_vec())
            }
        }
    }

    /// Deserializes an envelope from bytes.
    pub fn deserialize<P: DeserializeOwned>(&self, bytes: &[u8]) -> Result<EventEnvelope<P>> {
        match self {
            EventCodec::Json => Ok(serde_json::from_slice(bytes)?),
            EventCodec::Binary => {
                let record = EnvelopeRecord::decode(bytes)?;

                let event_id = Uuid::parse_str(&record.event_id).map_err(|e| {
                    MessagingError::InvalidField {
                        field: "eventId",
                        message: e.to_string(),
                    }
                })?;
                let occurred_at = DateTime::parse_from_rfc3339(&record.occurred_at).map_err(
                    |e| MessagingError::InvalidField {
                        field: "occurredAt",
                        message: e.to_string(),
                    },
                )?;
                let payload = serde_json::from_str(&record.payload_json)?;

                Ok(EventEnvelope {
                    event_id: EventId::from_uuid(event_id),
                    event_type: record.event_type,
                    version: record.version,
                    occurred_at,
                    correlation_id: record.correlation_id,
                    partition_key: record.partition_key,
                    payload,
                })
            }
        }
    }
}

/// Resolves codecs by the format name carried in transport metadata.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    default_format: String,
}

impl CodecRegistry {
    /// Creates a registry with the process-wide default format.
    pub fn new(default_format: impl Into<String>) -> Self {
        Self {
            default_format: default_format.into(),
        }
    }

    /// Returns the configured default format name.
    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    /// Resolves a codec by name, case-insensitively.
    ///
    /// A `None` or blank name falls back to the configured default. An
    /// unrecognized name fails with [`MessagingError::UnknownFormat`].
    pub fn resolve(&self, format: Option<&str>) -> Result<EventCodec> {
        let name = match format {
            Some(f) if !f.trim().is_empty() => f,
            _ => &self.default_format,
        };

        if name.eq_ignore_ascii_case(FORMAT_JSON) {
            Ok(EventCodec::Json)
        } else if name.eq_ignore_ascii_case(FORMAT_BINARY) {
            Ok(EventCodec::Binary)
        } else {
            Err(MessagingError::UnknownFormat(name.to_string()))
        }
    }

    /// Resolves the configured default codec.
    pub fn default_codec(&self) -> Result<EventCodec> {
        self.resolve(None)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new(FORMAT_JSON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ORDER_CREATED, OrderCreatedV1, OrderCreatedV2};
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn v1_envelope() -> EventEnvelope<OrderCreatedV1> {
        let payload = OrderCreatedV1 {
            order_id: "order-1".to_string(),
            customer_id: "acme".to_string(),
            amount: Decimal::from_str("100.50").unwrap(),
            currency: "USD".to_string(),
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:30:00+02:00").unwrap(),
            created_by: "api".to_string(),
        };
        EventEnvelope::create(ORDER_CREATED, 1, "acme", payload, Some("corr-1".to_string()))
    }

    fn v2_envelope() -> EventEnvelope<OrderCreatedV2> {
        let payload = OrderCreatedV2 {
            order_id: "order-2".to_string(),
            customer_id: "globex".to_string(),
            amount: Decimal::from_str("0.01").unwrap(),
            currency: "EUR".to_string(),
            created_at: DateTime::parse_from_rfc3339("2023-11-30T23:59:59-05:00").unwrap(),
            created_by: "api".to_string(),
            source_system: "erp".to_string(),
            attributes: Some(HashMap::from([("channel".to_string(), "web".to_string())])),
        };
        EventEnvelope::create(ORDER_CREATED, 2, "globex", payload, None)
    }

    #[test]
    fn json_roundtrips_v1_envelope() {
        let envelope = v1_envelope();
        let bytes = EventCodec::Json.serialize(&envelope).unwrap();
        let back: EventEnvelope<OrderCreatedV1> = EventCodec::Json.deserialize(&bytes).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn json_roundtrips_v2_envelope() {
        let envelope = v2_envelope();
        let bytes = EventCodec::Json.serialize(&envelope).unwrap();
        let back: EventEnvelope<OrderCreatedV2> = EventCodec::Json.deserialize(&bytes).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn binary_roundtrips_v1_envelope() {
        let envelope = v1_envelope();
        let bytes = EventCodec::Binary.serialize(&envelope).unwrap();
        let back: EventEnvelope<OrderCreatedV1> = EventCodec::Binary.deserialize(&bytes).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn binary_roundtrips_v2_envelope() {
        let envelope = v2_envelope();
        let bytes = EventCodec::Binary.serialize(&envelope).unwrap();
        let back: EventEnvelope<OrderCreatedV2> = EventCodec::Binary.deserialize(&bytes).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn binary_preserves_decimal_and_offset_exactly() {
        let envelope = v1_envelope();
        let bytes = EventCodec::Binary.serialize(&envelope).unwrap();
        let back: EventEnvelope<OrderCreatedV1> = EventCodec::Binary.deserialize(&bytes).unwrap();
        assert_eq!(back.payload.amount, Decimal::from_str("100.50").unwrap());
        assert_eq!(back.payload.amount.to_string(), "100.50");
        assert_eq!(
            back.payload.created_at.offset().local_minus_utc(),
            2 * 3600
        );
        assert_eq!(back.occurred_at, envelope.occurred_at);
    }

    #[test]
    fn registry_resolves_case_insensitively() {
        let registry = CodecRegistry::new(FORMAT_JSON);
        assert_eq!(registry.resolve(Some("JSON")).unwrap(), EventCodec::Json);
        assert_eq!(
            registry.resolve(Some("Binary")).unwrap(),
            EventCodec::Binary
        );
    }

    #[test]
    fn registry_falls_back_to_default_for_blank_names() {
        let registry = CodecRegistry::new(FORMAT_BINARY);
        assert_eq!(registry.resolve(None).unwrap(), EventCodec::Binary);
        assert_eq!(registry.resolve(Some("  ")).unwrap(), EventCodec::Binary);
    }

    #[test]
    fn registry_rejects_unknown_formats() {
        let registry = CodecRegistry::default();
        let err = registry.resolve(Some("avro")).unwrap_err();
        assert!(matches!(err, MessagingError::UnknownFormat(name) if name == "avro"));
    }

    #[test]
    fn binary_rejects_garbage_bytes() {
        let result: Result<EventEnvelope<OrderCreatedV1>> =
            EventCodec::Binary.deserialize(&[0xff, 0xff, 0xff]);
        assert!(result.is_err());
    }
}
