//! Kafka transport adapters (consumer-group-with-offset-commit paradigm).
//!
//! One topic carries every order event; the message key is the partition
//! key, so a customer's events stay on one ordered topic partition. Offsets
//! are committed synchronously after the handler returns, never before.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{KafkaConfig, ReplayConfig};
use crate::consumer::{ConsumedEventHandler, EventConsumer, Lifecycle};
use crate::context::ConsumedEventContext;
use crate::error::{MessagingError, Result};
use crate::headers::{self, EventHeaders};
use crate::publisher::{EventPublisher, OutboundEvent};
use crate::replay::{ReplayCoordinator, ReplayResult};

/// librdkafka's default `message.max.bytes`.
const KAFKA_MESSAGE_MAX_BYTES: usize = 1_000_000;

fn base_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", &config.bootstrap_servers);
    client_config.set("security.protocol", &config.security_protocol);

    if let (Some(mechanism), Some(username), Some(password)) = (
        config.sasl_mechanism.as_deref(),
        config.sasl_username.as_deref(),
        config.sasl_password.as_deref(),
    ) {
        client_config.set("sasl.mechanism", mechanism);
        client_config.set("sasl.username", username);
        client_config.set("sasl.password", password);
    }

    client_config
}

fn producer_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = base_config(config);
    client_config.set("acks", "all");
    client_config.set("enable.idempotence", "true");
    client_config.set("message.send.max.retries", "3");
    client_config
}

fn consumer_config(config: &KafkaConfig, group_id: &str) -> ClientConfig {
    let mut client_config = base_config(config);
    client_config.set("group.id", group_id);
    client_config.set("enable.auto.commit", "false");
    client_config.set("auto.offset.reset", "earliest");
    client_config.set("enable.partition.eof", "false");
    client_config
}

fn transport_headers(event: &OutboundEvent) -> OwnedHeaders {
    let version = event.version.to_string();
    OwnedHeaders::new()
        .insert(Header {
            key: headers::EVENT_TYPE,
            value: Some(event.event_type.as_bytes()),
        })
        .insert(Header {
            key: headers::EVENT_VERSION,
            value: Some(version.as_bytes()),
        })
        .insert(Header {
            key: headers::CORRELATION_ID,
            value: Some(event.correlation_id.as_bytes()),
        })
        .insert(Header {
            key: headers::PARTITION_KEY,
            value: Some(event.partition_key.as_bytes()),
        })
        .insert(Header {
            key: headers::PAYLOAD_FORMAT,
            value: Some(event.payload_format.as_bytes()),
        })
}

fn context_from_message(
    message: &rdkafka::message::BorrowedMessage<'_>,
    default_format: &str,
) -> ConsumedEventContext {
    let header_pairs: Vec<(&str, &[u8])> = message
        .headers()
        .map(|hs| {
            hs.iter()
                .filter_map(|h| h.value.map(|v| (h.key, v)))
                .collect()
        })
        .unwrap_or_default();

    let event_headers = EventHeaders::from_pairs(header_pairs);
    let fallback_key = message
        .key()
        .and_then(|k| std::str::from_utf8(k).ok())
        .map(str::to_string);

    ConsumedEventContext::from_headers(
        message.payload().unwrap_or_default().to_vec(),
        event_headers,
        fallback_key,
        message.partition().to_string(),
        Some(message.offset()),
        default_format,
    )
}

/// Publishes events to the Kafka topic with an idempotent producer.
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaEventPublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = producer_config(config)
            .create()
            .map_err(|e| MessagingError::Transport(format!("failed to create producer: {e}")))?;

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            topic = %config.topic,
            "connected Kafka producer"
        );

        Ok(Self {
            producer,
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: OutboundEvent) -> Result<()> {
        let record = FutureRecord::to(&self.topic)
            .key(&event.partition_key)
            .payload(&event.body)
            .headers(transport_headers(&event))
            .timestamp(event.occurred_at.timestamp_millis());

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| match e {
                KafkaError::MessageProduction(RDKafkaErrorCode::MessageSizeTooLarge) => {
                    MessagingError::MessageTooLarge {
                        size: event.body.len(),
                        limit: KAFKA_MESSAGE_MAX_BYTES,
                    }
                }
                other => MessagingError::Publish(other.to_string()),
            })?;

        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            version = event.version,
            partition_key = %event.partition_key,
            "published Kafka event"
        );
        metrics::counter!("events_published").increment(1);

        Ok(())
    }
}

/// Consumer-group polling loop with synchronous post-handler offset commits.
pub struct KafkaEventConsumer {
    config: KafkaConfig,
    default_format: String,
    lifecycle: Lifecycle,
}

impl KafkaEventConsumer {
    pub fn new(config: KafkaConfig, default_format: impl Into<String>) -> Self {
        Self {
            config,
            default_format: default_format.into(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Current lifecycle state, for diagnostics.
    pub fn state(&self) -> crate::consumer::ConsumerState {
        self.lifecycle.state()
    }
}

#[async_trait]
impl EventConsumer for KafkaEventConsumer {
    async fn run(
        &self,
        handler: Arc<dyn ConsumedEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.lifecycle.start()?;

        let consumer: StreamConsumer =
            consumer_config(&self.config, &self.config.consumer_group)
                .create()
                .map_err(|e| {
                    self.lifecycle.stopped();
                    MessagingError::Transport(format!("failed to create consumer: {e}"))
                })?;

        consumer.subscribe(&[self.config.topic.as_str()]).map_err(|e| {
            self.lifecycle.stopped();
            MessagingError::Transport(format!("failed to subscribe: {e}"))
        })?;

        info!(
            topic = %self.config.topic,
            group = %self.config.consumer_group,
            "Kafka consumer running"
        );

        let result = self.poll_loop(&consumer, handler, &shutdown).await;
        self.lifecycle.stopped();
        result
    }
}

impl KafkaEventConsumer {
    async fn poll_loop(
        &self,
        consumer: &StreamConsumer,
        handler: Arc<dyn ConsumedEventHandler>,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        loop {
            let message = tokio::select! {
                () = shutdown.cancelled() => {
                    self.lifecycle.draining();
                    info!("shutdown requested, Kafka consumer draining");
                    return Ok(());
                }
                received = consumer.recv() => received
                    .map_err(|e| MessagingError::Transport(format!("consume failed: {e}")))?,
            };

            let context = context_from_message(&message, &self.default_format);
            let partition = message.partition();
            let offset = message.offset();

            if let Err(e) = handler.handle(context).await {
                // Fail fast on poison messages; the uncommitted offset means
                // the message is redelivered once an operator intervenes.
                error!(
                    partition,
                    offset,
                    error = %e,
                    "event handler failed, terminating Kafka consumer"
                );
                return Err(MessagingError::Handler(e));
            }

            // Commit after the handler: the at-least-once contract.
            consumer
                .commit_message(&message, CommitMode::Sync)
                .map_err(|e| MessagingError::Transport(format!("offset commit failed: {e}")))?;
            metrics::counter!("events_consumed").increment(1);
        }
    }
}

/// Replays the full topic under a group id isolated from live consumption.
pub struct KafkaReplayCoordinator {
    config: KafkaConfig,
    replay: ReplayConfig,
    default_format: String,
}

impl KafkaReplayCoordinator {
    pub fn new(config: KafkaConfig, replay: ReplayConfig, default_format: impl Into<String>) -> Self {
        Self {
            config,
            replay,
            default_format: default_format.into(),
        }
    }

    fn replay_group_id(&self) -> String {
        let configured = self.config.replay_consumer_group.trim();
        if configured.is_empty() {
            format!("replay-{}", Uuid::new_v4().simple())
        } else {
            configured.to_string()
        }
    }
}

#[async_trait]
impl ReplayCoordinator for KafkaReplayCoordinator {
    async fn replay(
        &self,
        handler: Arc<dyn ConsumedEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<ReplayResult> {
        let group_id = self.replay_group_id();
        let consumer: StreamConsumer = consumer_config(&self.config, &group_id)
            .create()
            .map_err(|e| MessagingError::Transport(format!("failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[self.config.topic.as_str()])
            .map_err(|e| MessagingError::Transport(format!("failed to subscribe: {e}")))?;

        info!(topic = %self.config.topic, group = %group_id, "replay started");

        let max_wait = Duration::from_secs(self.replay.max_wait_secs);
        let mut processed_events: u64 = 0;
        let mut seen_partitions = std::collections::HashSet::new();
        let mut empty_reads: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                warn!("replay cancelled before completion");
                break;
            }

            let message = match tokio::time::timeout(max_wait, consumer.recv()).await {
                Ok(received) => received
                    .map_err(|e| MessagingError::Transport(format!("consume failed: {e}")))?,
                Err(_) => {
                    empty_reads += 1;
                    if empty_reads >= self.replay.consecutive_empty_reads_to_stop {
                        break;
                    }
                    continue;
                }
            };

            empty_reads = 0;
            seen_partitions.insert(message.partition());

            let context = context_from_message(&message, &self.default_format);
            handler
                .handle(context)
                .await
                .map_err(MessagingError::Handler)?;
            processed_events += 1;

            // Offsets are never committed here: replay progress must not
            // perturb the live consumer group.
        }

        Ok(ReplayResult {
            processed_events,
            partitions_visited: seen_partitions.len() as u32,
        })
    }
}
