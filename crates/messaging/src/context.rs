//! Transport-neutral consumed-event model.

use crate::headers::EventHeaders;

/// Normalized view of one received message, independent of the transport it
/// arrived on.
///
/// Created per message by a transport adapter and handed to the projection
/// handler exactly once; never persisted. The body stays undecoded here —
/// payload decoding belongs to the projection engine, which knows the
/// version registry.
#[derive(Debug, Clone)]
pub struct ConsumedEventContext {
    pub body: Vec<u8>,
    pub event_type: String,
    pub version: i32,
    pub partition_key: String,
    pub partition_id: String,
    pub offset: Option<i64>,
    pub payload_format: String,
    pub correlation_id: Option<String>,
}

impl ConsumedEventContext {
    /// Assembles a context from the typed header view plus the
    /// transport-specific position fields.
    ///
    /// `fallback_key` is the transport's own message key (Kafka) when the
    /// partition-key header is absent; `default_format` applies when no
    /// payload-format header was sent.
    pub fn from_headers(
        body: Vec<u8>,
        headers: EventHeaders,
        fallback_key: Option<String>,
        partition_id: String,
        offset: Option<i64>,
        default_format: &str,
    ) -> Self {
        Self {
            body,
            event_type: headers.event_type,
            version: headers.version,
            partition_key: headers
                .partition_key
                .or(fallback_key)
                .unwrap_or_default(),
            partition_id,
            offset,
            payload_format: headers
                .payload_format
                .unwrap_or_else(|| default_format.to_string()),
            correlation_id: headers.correlation_id,
        }
    }
}
