//! Transport metadata headers shared by every adapter.

/// Header key carrying the logical event type name.
pub const EVENT_TYPE: &str = "event-type";
/// Header key carrying the payload schema version as text.
pub const EVENT_VERSION: &str = "event-version";
/// Header key carrying the correlation id.
pub const CORRELATION_ID: &str = "correlation-id";
/// Header key carrying the business partition key.
pub const PARTITION_KEY: &str = "partition-key";
/// Header key naming the codec that serialized the body.
pub const PAYLOAD_FORMAT: &str = "payload-format";

/// Typed view of a received message's transport metadata.
///
/// Populated once at normalization time so handler code never does per-field
/// byte coercion. Header name matching is case-insensitive; a missing or
/// unparsable value falls back to a safe default (`"unknown"` type,
/// version 1) rather than failing the receive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHeaders {
    pub event_type: String,
    pub version: i32,
    pub partition_key: Option<String>,
    pub payload_format: Option<String>,
    pub correlation_id: Option<String>,
}

impl EventHeaders {
    /// Builds the typed view from raw `(name, value-bytes)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut headers = Self {
            event_type: "unknown".to_string(),
            version: 1,
            partition_key: None,
            payload_format: None,
            correlation_id: None,
        };

        for (name, value) in pairs {
            let Some(value) = non_empty_utf8(value) else {
                continue;
            };

            if name.eq_ignore_ascii_case(EVENT_TYPE) {
                headers.event_type = value;
            } else if name.eq_ignore_ascii_case(EVENT_VERSION) {
                if let Ok(version) = value.parse() {
                    headers.version = version;
                }
            } else if name.eq_ignore_ascii_case(PARTITION_KEY) {
                headers.partition_key = Some(value);
            } else if name.eq_ignore_ascii_case(PAYLOAD_FORMAT) {
                headers.payload_format = Some(value);
            } else if name.eq_ignore_ascii_case(CORRELATION_ID) {
                headers.correlation_id = Some(value);
            }
        }

        headers
    }
}

fn non_empty_utf8(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_known_headers() {
        let pairs: Vec<(&str, &[u8])> = vec![
            (EVENT_TYPE, b"order.created"),
            (EVENT_VERSION, b"2"),
            (PARTITION_KEY, b"acme"),
            (PAYLOAD_FORMAT, b"json"),
            (CORRELATION_ID, b"corr-1"),
        ];
        let headers = EventHeaders::from_pairs(pairs);
        assert_eq!(headers.event_type, "order.created");
        assert_eq!(headers.version, 2);
        assert_eq!(headers.partition_key.as_deref(), Some("acme"));
        assert_eq!(headers.payload_format.as_deref(), Some("json"));
        assert_eq!(headers.correlation_id.as_deref(), Some("corr-1"));
    }

    #[test]
    fn header_names_match_case_insensitively() {
        let pairs: Vec<(&str, &[u8])> =
            vec![("Event-Type", b"order.created"), ("EVENT-VERSION", b"3")];
        let headers = EventHeaders::from_pairs(pairs);
        assert_eq!(headers.event_type, "order.created");
        assert_eq!(headers.version, 3);
    }

    #[test]
    fn missing_headers_fall_back_to_defaults() {
        let headers = EventHeaders::from_pairs(std::iter::empty());
        assert_eq!(headers.event_type, "unknown");
        assert_eq!(headers.version, 1);
        assert!(headers.partition_key.is_none());
        assert!(headers.payload_format.is_none());
        assert!(headers.correlation_id.is_none());
    }

    #[test]
    fn unparsable_version_keeps_default() {
        let pairs: Vec<(&str, &[u8])> = vec![(EVENT_VERSION, b"not-a-number")];
        let headers = EventHeaders::from_pairs(pairs);
        assert_eq!(headers.version, 1);
    }

    #[test]
    fn empty_values_are_treated_as_absent() {
        let pairs: Vec<(&str, &[u8])> = vec![(CORRELATION_ID, b"")];
        let headers = EventHeaders::from_pairs(pairs);
        assert!(headers.correlation_id.is_none());
    }
}
