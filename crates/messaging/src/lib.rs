//! Transport-agnostic event publishing, consumption, and replay.
//!
//! This crate spans two broker paradigms behind one set of abstractions:
//! Kafka (consumer group with explicit offset commits) and NATS JetStream
//! (partitioned log with per-partition checkpoints). It provides:
//!
//! - [`EventCodec`] / [`CodecRegistry`] — pluggable byte codecs selected by
//!   the `payload-format` transport header
//! - [`EventPublisher`] — send one or many packed envelopes with transport
//!   metadata headers
//! - [`EventConsumer`] — long-running receive loop that normalizes messages
//!   into [`ConsumedEventContext`], invokes a handler, and only then
//!   advances durable consumption progress (the at-least-once contract)
//! - [`ReplayCoordinator`] — re-reads broker history under an identity
//!   isolated from live consumption and feeds the same handler
//! - [`MessagingConfig`] — environment-driven transport selection

pub mod codec;
pub mod config;
pub mod consumer;
pub mod context;
pub mod error;
pub mod headers;
pub mod kafka;
pub mod nats;
pub mod partition;
pub mod provider;
pub mod publisher;
pub mod replay;

pub use codec::{CodecRegistry, EventCodec};
pub use config::{KafkaConfig, MessagingConfig, NatsConfig, ReplayConfig, TransportProvider};
pub use consumer::{ConsumedEventHandler, ConsumerState, EventConsumer};
pub use context::ConsumedEventContext;
pub use error::{HandlerError, MessagingError, Result};
pub use headers::EventHeaders;
pub use partition::{partition_index_for, resolve_order_partition_key};
pub use publisher::{EventPublisher, OutboundEvent};
pub use replay::{ReplayCoordinator, ReplayResult};
