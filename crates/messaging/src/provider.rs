//! Transport provider selection.
//!
//! The broker paradigm is chosen once at process startup from configuration;
//! each factory returns the trait object the binaries wire together.

use std::sync::Arc;

use crate::config::{MessagingConfig, TransportProvider};
use crate::consumer::EventConsumer;
use crate::error::Result;
use crate::kafka::{KafkaEventConsumer, KafkaEventPublisher, KafkaReplayCoordinator};
use crate::nats::{NatsEventConsumer, NatsEventPublisher, NatsReplayCoordinator, NatsTransport};
use crate::publisher::EventPublisher;
use crate::replay::ReplayCoordinator;

/// Builds the configured publisher.
pub async fn publisher(config: &MessagingConfig) -> Result<Arc<dyn EventPublisher>> {
    match config.provider {
        TransportProvider::Kafka => Ok(Arc::new(KafkaEventPublisher::new(&config.kafka)?)),
        TransportProvider::Nats => {
            let transport = NatsTransport::connect(&config.nats).await?;
            Ok(Arc::new(NatsEventPublisher::new(transport)))
        }
    }
}

/// Builds the configured consumer.
pub async fn consumer(config: &MessagingConfig) -> Result<Arc<dyn EventConsumer>> {
    match config.provider {
        TransportProvider::Kafka => Ok(Arc::new(KafkaEventConsumer::new(
            config.kafka.clone(),
            config.default_format.clone(),
        ))),
        TransportProvider::Nats => {
            let transport = NatsTransport::connect(&config.nats).await?;
            Ok(Arc::new(NatsEventConsumer::new(
                transport,
                config.default_format.clone(),
            )))
        }
    }
}

/// Builds the configured replay coordinator.
pub async fn replay_coordinator(config: &MessagingConfig) -> Result<Arc<dyn ReplayCoordinator>> {
    match config.provider {
        TransportProvider::Kafka => Ok(Arc::new(KafkaReplayCoordinator::new(
            config.kafka.clone(),
            config.replay.clone(),
            config.default_format.clone(),
        ))),
        TransportProvider::Nats => {
            let transport = NatsTransport::connect(&config.nats).await?;
            Ok(Arc::new(NatsReplayCoordinator::new(
                transport,
                config.replay.clone(),
                config.default_format.clone(),
            )))
        }
    }
}
