//! NATS JetStream transport adapters (partitioned-log-with-checkpoint
//! paradigm).
//!
//! The stream carries one subject per partition
//! (`{subject_prefix}.p{index}`); the publisher hashes the partition key to
//! a subject, which preserves per-key ordering. Live consumption runs one
//! durable pull consumer per partition — concurrent across partitions,
//! strictly sequential within one — and acks each message only after the
//! handler returns (the checkpoint write). Replay reads every partition from
//! the earliest position with ephemeral consumers, so it never touches the
//! durable consumers' progress.

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::{self, consumer::DeliverPolicy, stream};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{NatsConfig, ReplayConfig};
use crate::consumer::{ConsumedEventHandler, EventConsumer, Lifecycle};
use crate::context::ConsumedEventContext;
use crate::error::{MessagingError, Result};
use crate::headers::{self, EventHeaders};
use crate::partition::partition_index_for;
use crate::publisher::{EventPublisher, OutboundEvent};
use crate::replay::{ReplayCoordinator, ReplayResult};

/// How long a live fetch waits for messages before coming back empty.
const FETCH_WAIT: Duration = Duration::from_secs(5);
/// Redelivery timeout for unacked replay reads; generous so a slow replay
/// pass does not see duplicates from its own consumer.
const REPLAY_ACK_WAIT: Duration = Duration::from_secs(300);

/// Shared JetStream connection with the stream ensured.
#[derive(Clone)]
pub struct NatsTransport {
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsTransport {
    /// Connects to the server and creates the partitioned stream if needed.
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        let client = async_nats::connect(&config.url)
            .await
            .map_err(|e| MessagingError::Transport(format!("failed to connect to NATS: {e}")))?;
        let jetstream = jetstream::new(client);

        jetstream
            .get_or_create_stream(stream::Config {
                name: config.stream.clone(),
                subjects: vec![config.subject_wildcard()],
                ..Default::default()
            })
            .await
            .map_err(|e| MessagingError::Transport(format!("failed to ensure stream: {e}")))?;

        info!(url = %config.url, stream = %config.stream, "connected to NATS JetStream");

        Ok(Self {
            jetstream,
            config: config.clone(),
        })
    }
}

fn transport_headers(event: &OutboundEvent) -> async_nats::HeaderMap {
    let mut map = async_nats::HeaderMap::new();
    map.insert(headers::EVENT_TYPE, event.event_type.as_str());
    map.insert(headers::EVENT_VERSION, event.version.to_string().as_str());
    map.insert(headers::CORRELATION_ID, event.correlation_id.as_str());
    map.insert(headers::PARTITION_KEY, event.partition_key.as_str());
    map.insert(headers::PAYLOAD_FORMAT, event.payload_format);
    map
}

fn header_pairs(map: Option<&async_nats::HeaderMap>) -> Vec<(String, Vec<u8>)> {
    let Some(map) = map else {
        return Vec::new();
    };

    [
        headers::EVENT_TYPE,
        headers::EVENT_VERSION,
        headers::CORRELATION_ID,
        headers::PARTITION_KEY,
        headers::PAYLOAD_FORMAT,
    ]
    .iter()
    .filter_map(|name| {
        map.get(*name)
            .map(|value| ((*name).to_string(), value.as_str().as_bytes().to_vec()))
    })
    .collect()
}

fn context_from_message(
    message: &jetstream::Message,
    partition: u32,
    default_format: &str,
) -> ConsumedEventContext {
    let pairs = header_pairs(message.headers.as_ref());
    let event_headers =
        EventHeaders::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_slice())));
    let offset = message.info().ok().map(|info| info.stream_sequence as i64);

    ConsumedEventContext::from_headers(
        message.payload.to_vec(),
        event_headers,
        None,
        partition.to_string(),
        offset,
        default_format,
    )
}

/// Publishes events to the partitioned stream, awaiting the JetStream ack.
pub struct NatsEventPublisher {
    transport: NatsTransport,
}

impl NatsEventPublisher {
    pub fn new(transport: NatsTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, event: OutboundEvent) -> Result<()> {
        let config = &self.transport.config;

        if event.body.len() > config.max_message_bytes {
            return Err(MessagingError::MessageTooLarge {
                size: event.body.len(),
                limit: config.max_message_bytes,
            });
        }

        let partition = partition_index_for(&event.partition_key, config.partition_count);
        let subject = config.partition_subject(partition);
        let message_headers = transport_headers(&event);

        let ack = self
            .transport
            .jetstream
            .publish_with_headers(subject.clone(), message_headers, event.body.clone().into())
            .await
            .map_err(|e| MessagingError::Publish(e.to_string()))?;

        // The server-side ack confirms the message is persisted in the
        // stream before we report success.
        ack.await
            .map_err(|e| MessagingError::Publish(format!("ack failed: {e}")))?;

        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            version = event.version,
            partition_key = %event.partition_key,
            subject = %subject,
            "published JetStream event"
        );
        metrics::counter!("events_published").increment(1);

        Ok(())
    }
}

/// Per-partition durable consumers with handler-then-ack checkpointing.
pub struct NatsEventConsumer {
    transport: NatsTransport,
    default_format: String,
    lifecycle: Lifecycle,
}

impl NatsEventConsumer {
    pub fn new(transport: NatsTransport, default_format: impl Into<String>) -> Self {
        Self {
            transport,
            default_format: default_format.into(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Current lifecycle state, for diagnostics.
    pub fn state(&self) -> crate::consumer::ConsumerState {
        self.lifecycle.state()
    }

    async fn run_partition(
        jetstream: jetstream::Context,
        config: NatsConfig,
        default_format: String,
        partition: u32,
        handler: Arc<dyn ConsumedEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let consumer_name = format!("{}-p{partition}", config.durable_group);
        let consumer = jetstream
            .create_consumer_on_stream(
                jetstream::consumer::pull::Config {
                    name: Some(consumer_name.clone()),
                    durable_name: Some(consumer_name.clone()),
                    filter_subject: config.partition_subject(partition),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
                config.stream.as_str(),
            )
            .await
            .map_err(|e| {
                MessagingError::Transport(format!("failed to create consumer {consumer_name}: {e}"))
            })?;

        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }

            let mut batch = consumer
                .fetch()
                .max_messages(config.fetch_batch_size)
                .expires(FETCH_WAIT)
                .messages()
                .await
                .map_err(|e| MessagingError::Transport(format!("fetch failed: {e}")))?;

            while let Some(received) = batch.next().await {
                let message = received
                    .map_err(|e| MessagingError::Transport(format!("receive failed: {e}")))?;

                let context = context_from_message(&message, partition, &default_format);
                let offset = context.offset;

                if let Err(e) = handler.handle(context).await {
                    // Fail fast on poison messages; the unacked message is
                    // redelivered once an operator intervenes.
                    error!(
                        partition,
                        offset,
                        error = %e,
                        "event handler failed, terminating JetStream consumer"
                    );
                    shutdown.cancel();
                    return Err(MessagingError::Handler(e));
                }

                // Ack after the handler: this is the checkpoint write.
                message
                    .ack()
                    .await
                    .map_err(|e| MessagingError::Transport(format!("ack failed: {e}")))?;
                metrics::counter!("events_consumed").increment(1);
            }
        }
    }
}

#[async_trait]
impl EventConsumer for NatsEventConsumer {
    async fn run(
        &self,
        handler: Arc<dyn ConsumedEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.lifecycle.start()?;

        let config = &self.transport.config;
        info!(
            stream = %config.stream,
            partitions = config.partition_count,
            group = %config.durable_group,
            "JetStream consumer running"
        );

        // Child token so a failing partition stops its siblings without
        // cancelling the caller's token.
        let partition_shutdown = shutdown.child_token();
        let mut tasks = tokio::task::JoinSet::new();

        for partition in 0..config.partition_count {
            tasks.spawn(Self::run_partition(
                self.transport.jetstream.clone(),
                config.clone(),
                self.default_format.clone(),
                partition,
                Arc::clone(&handler),
                partition_shutdown.clone(),
            ));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => Err(MessagingError::Transport(format!("partition task failed: {e}"))),
            };
            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                }
                partition_shutdown.cancel();
            }
            if shutdown.is_cancelled() {
                self.lifecycle.draining();
            }
        }

        self.lifecycle.stopped();
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Replays every partition from the earliest position with ephemeral
/// consumers.
pub struct NatsReplayCoordinator {
    transport: NatsTransport,
    replay: ReplayConfig,
    default_format: String,
}

impl NatsReplayCoordinator {
    pub fn new(
        transport: NatsTransport,
        replay: ReplayConfig,
        default_format: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            replay,
            default_format: default_format.into(),
        }
    }
}

#[async_trait]
impl ReplayCoordinator for NatsReplayCoordinator {
    async fn replay(
        &self,
        handler: Arc<dyn ConsumedEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<ReplayResult> {
        let config = &self.transport.config;
        let max_wait = Duration::from_secs(self.replay.max_wait_secs);
        let mut processed_events: u64 = 0;
        let mut partitions_visited: u32 = 0;

        info!(
            stream = %config.stream,
            partitions = config.partition_count,
            "replay started"
        );

        for partition in 0..config.partition_count {
            if shutdown.is_cancelled() {
                break;
            }
            partitions_visited += 1;

            // Ephemeral consumer from the earliest position: replay progress
            // lives and dies with this run, isolated from the durable
            // projection consumers.
            let consumer = self
                .transport
                .jetstream
                .create_consumer_on_stream(
                    jetstream::consumer::pull::Config {
                        filter_subject: config.partition_subject(partition),
                        deliver_policy: DeliverPolicy::All,
                        ack_policy: jetstream::consumer::AckPolicy::Explicit,
                        ack_wait: REPLAY_ACK_WAIT,
                        inactive_threshold: Duration::from_secs(60),
                        ..Default::default()
                    },
                    config.stream.as_str(),
                )
                .await
                .map_err(|e| {
                    MessagingError::Transport(format!("failed to create replay consumer: {e}"))
                })?;

            let mut empty_reads: u32 = 0;
            'partition: loop {
                if shutdown.is_cancelled() {
                    break 'partition;
                }

                let mut batch = consumer
                    .fetch()
                    .max_messages(config.fetch_batch_size)
                    .expires(max_wait)
                    .messages()
                    .await
                    .map_err(|e| MessagingError::Transport(format!("fetch failed: {e}")))?;

                let mut received_any = false;
                while let Some(received) = batch.next().await {
                    let message = received
                        .map_err(|e| MessagingError::Transport(format!("receive failed: {e}")))?;
                    received_any = true;

                    let context = context_from_message(&message, partition, &self.default_format);
                    handler
                        .handle(context)
                        .await
                        .map_err(MessagingError::Handler)?;
                    processed_events += 1;
                }

                if received_any {
                    empty_reads = 0;
                } else {
                    empty_reads += 1;
                    if empty_reads >= self.replay.consecutive_empty_reads_to_stop {
                        break 'partition;
                    }
                }
            }
        }

        Ok(ReplayResult {
            processed_events,
            partitions_visited,
        })
    }
}
