//! Messaging configuration loaded from environment variables.

use crate::codec::FORMAT_JSON;

/// Which broker backs the pipeline. Selected once at process startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProvider {
    Kafka,
    Nats,
}

impl TransportProvider {
    fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("kafka") {
            Some(Self::Kafka)
        } else if value.eq_ignore_ascii_case("nats") {
            Some(Self::Nats)
        } else {
            None
        }
    }
}

/// Kafka connection and consumer-group settings.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub topic: String,
    pub consumer_group: String,
    /// Replay group id; blank means "generate a random one per replay run".
    pub replay_consumer_group: String,
    pub security_protocol: String,
    pub sasl_mechanism: Option<String>,
    pub sasl_username: Option<String>,
    pub sasl_password: Option<String>,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            topic: "orders".to_string(),
            consumer_group: "projection".to_string(),
            replay_consumer_group: "replay".to_string(),
            security_protocol: "plaintext".to_string(),
            sasl_mechanism: None,
            sasl_username: None,
            sasl_password: None,
        }
    }
}

/// NATS JetStream stream and partitioning settings.
#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub url: String,
    pub stream: String,
    pub subject_prefix: String,
    pub partition_count: u32,
    /// Durable consumer name prefix; the per-partition consumers are named
    /// `{durable_group}-p{index}`.
    pub durable_group: String,
    pub max_message_bytes: usize,
    pub fetch_batch_size: usize,
}

impl NatsConfig {
    /// Subject for one partition of the stream.
    pub fn partition_subject(&self, partition: u32) -> String {
        format!("{}.p{partition}", self.subject_prefix)
    }

    /// Subject wildcard covering every partition.
    pub fn subject_wildcard(&self) -> String {
        format!("{}.*", self.subject_prefix)
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            stream: "orders".to_string(),
            subject_prefix: "orders.events".to_string(),
            partition_count: 4,
            durable_group: "projection".to_string(),
            max_message_bytes: 1024 * 1024,
            fetch_batch_size: 16,
        }
    }
}

/// Replay loop controls preventing endless waits on drained streams.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub max_wait_secs: u64,
    pub consecutive_empty_reads_to_stop: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: 2,
            consecutive_empty_reads_to_stop: 3,
        }
    }
}

/// Root messaging configuration.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub provider: TransportProvider,
    pub kafka: KafkaConfig,
    pub nats: NatsConfig,
    pub default_format: String,
    pub replay: ReplayConfig,
}

impl MessagingConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults suitable for local development.
    pub fn from_env() -> Self {
        let kafka = KafkaConfig {
            bootstrap_servers: env_or("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
            topic: env_or("KAFKA_TOPIC", "orders"),
            consumer_group: env_or("KAFKA_CONSUMER_GROUP", "projection"),
            replay_consumer_group: env_or("KAFKA_REPLAY_CONSUMER_GROUP", "replay"),
            security_protocol: env_or("KAFKA_SECURITY_PROTOCOL", "plaintext"),
            sasl_mechanism: std::env::var("KAFKA_SASL_MECHANISM").ok(),
            sasl_username: std::env::var("KAFKA_SASL_USERNAME").ok(),
            sasl_password: std::env::var("KAFKA_SASL_PASSWORD").ok(),
        };

        let nats = NatsConfig {
            url: env_or("NATS_URL", "nats://localhost:4222"),
            stream: env_or("NATS_STREAM", "orders"),
            subject_prefix: env_or("NATS_SUBJECT_PREFIX", "orders.events"),
            partition_count: env_parse_or("NATS_PARTITION_COUNT", 4),
            durable_group: env_or("NATS_DURABLE_GROUP", "projection"),
            max_message_bytes: env_parse_or("NATS_MAX_MESSAGE_BYTES", 1024 * 1024),
            fetch_batch_size: env_parse_or("NATS_FETCH_BATCH_SIZE", 16),
        };

        let replay = ReplayConfig {
            max_wait_secs: env_parse_or("REPLAY_MAX_WAIT_SECS", 2).max(1),
            consecutive_empty_reads_to_stop: env_parse_or("REPLAY_EMPTY_READS_TO_STOP", 3).max(1),
        };

        Self {
            provider: std::env::var("MESSAGING_PROVIDER")
                .ok()
                .and_then(|v| TransportProvider::parse(&v))
                .unwrap_or(TransportProvider::Nats),
            kafka,
            nats,
            default_format: env_or("PAYLOAD_FORMAT", FORMAT_JSON),
            replay,
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            provider: TransportProvider::Nats,
            kafka: KafkaConfig::default(),
            nats: NatsConfig::default(),
            default_format: FORMAT_JSON.to_string(),
            replay: ReplayConfig::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_development() {
        let config = MessagingConfig::default();
        assert_eq!(config.provider, TransportProvider::Nats);
        assert_eq!(config.kafka.bootstrap_servers, "localhost:9092");
        assert_eq!(config.kafka.topic, "orders");
        assert_eq!(config.kafka.consumer_group, "projection");
        assert_eq!(config.nats.partition_count, 4);
        assert_eq!(config.default_format, "json");
        assert_eq!(config.replay.max_wait_secs, 2);
        assert_eq!(config.replay.consecutive_empty_reads_to_stop, 3);
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!(
            TransportProvider::parse("Kafka"),
            Some(TransportProvider::Kafka)
        );
        assert_eq!(
            TransportProvider::parse("NATS"),
            Some(TransportProvider::Nats)
        );
        assert_eq!(TransportProvider::parse("rabbitmq"), None);
    }

    #[test]
    fn nats_subjects_are_partitioned() {
        let nats = NatsConfig::default();
        assert_eq!(nats.partition_subject(2), "orders.events.p2");
        assert_eq!(nats.subject_wildcard(), "orders.events.*");
    }
}
