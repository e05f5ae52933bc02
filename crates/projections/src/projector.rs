//! Version-dispatching projection engine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use common::EventId;
use contracts::{EventEnvelope, ORDER_CREATED, OrderCreatedV1, OrderCreatedV2};
use messaging::{CodecRegistry, ConsumedEventContext, ConsumedEventHandler, HandlerError};
use rust_decimal::Decimal;

use crate::Result;
use crate::read_model::{OrderProjection, ProcessedEventMarker};
use crate::store::ProjectionStore;

/// Source-system value recorded for payload versions that predate the field.
const LEGACY_SOURCE_SYSTEM: &str = "legacy";

/// What a single apply did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The projection and marker were written.
    Applied,
    /// A marker for this event id already existed; nothing was written.
    Duplicate,
    /// The event type is not recognized; skipped for forward compatibility.
    UnknownEventType,
    /// The declared payload version has no registered mapping; skipped.
    UnknownVersion,
}

/// Decodes consumed events by declared version and applies them to the read
/// model exactly once.
///
/// Implements [`ConsumedEventHandler`], so live consumption and replay drive
/// the identical decode/apply path — which is why replaying events that live
/// consumption already applied is a safe no-op.
pub struct OrderProjector {
    store: Arc<dyn ProjectionStore>,
    codecs: CodecRegistry,
}

impl OrderProjector {
    /// Creates a projector over the given store and codec registry.
    pub fn new(store: Arc<dyn ProjectionStore>, codecs: CodecRegistry) -> Self {
        Self { store, codecs }
    }

    /// Applies one consumed event.
    ///
    /// Unknown event types and versions are skipped outcomes, not errors;
    /// codec resolution and decode failures are fatal to the message and
    /// propagate to the caller.
    #[tracing::instrument(
        skip(self, context),
        fields(
            event_type = %context.event_type,
            version = context.version,
            partition = %context.partition_id,
            offset = context.offset,
        )
    )]
    pub async fn apply(&self, context: &ConsumedEventContext) -> Result<ApplyOutcome> {
        if !context.event_type.eq_ignore_ascii_case(ORDER_CREATED) {
            tracing::debug!("skipping unsupported event type");
            return Ok(ApplyOutcome::UnknownEventType);
        }

        let codec = self.codecs.resolve(Some(&context.payload_format))?;

        match context.version {
            1 => {
                let envelope: EventEnvelope<OrderCreatedV1> = codec.deserialize(&context.body)?;
                let fields = OrderFields {
                    order_id: envelope.payload.order_id.clone(),
                    customer_id: envelope.payload.customer_id.clone(),
                    amount: envelope.payload.amount,
                    currency: envelope.payload.currency.clone(),
                    created_at: envelope.payload.created_at,
                    source_system: Some(LEGACY_SOURCE_SYSTEM.to_string()),
                };
                self.apply_order(&envelope_meta(&envelope), context, fields)
                    .await
            }
            2 => {
                let envelope: EventEnvelope<OrderCreatedV2> = codec.deserialize(&context.body)?;
                let fields = OrderFields {
                    order_id: envelope.payload.order_id.clone(),
                    customer_id: envelope.payload.customer_id.clone(),
                    amount: envelope.payload.amount,
                    currency: envelope.payload.currency.clone(),
                    created_at: envelope.payload.created_at,
                    source_system: Some(envelope.payload.source_system.clone()),
                };
                self.apply_order(&envelope_meta(&envelope), context, fields)
                    .await
            }
            unsupported => {
                tracing::warn!(version = unsupported, "unsupported event version, skipping");
                Ok(ApplyOutcome::UnknownVersion)
            }
        }
    }

    async fn apply_order(
        &self,
        meta: &EnvelopeMeta,
        context: &ConsumedEventContext,
        fields: OrderFields,
    ) -> Result<ApplyOutcome> {
        let now = Utc::now();

        let projection = OrderProjection {
            order_id: fields.order_id.clone(),
            customer_id: fields.customer_id,
            amount: fields.amount,
            currency: fields.currency,
            created_at: fields.created_at.with_timezone(&Utc),
            updated_at: now,
            source_system: fields.source_system,
            last_event_version: meta.version,
            last_event_id: meta.event_id,
        };

        let marker = ProcessedEventMarker {
            event_id: meta.event_id,
            event_type: meta.event_type.clone(),
            version: meta.version,
            partition_id: context.partition_id.clone(),
            offset: context.offset,
            processed_at: now,
        };

        let applied = self.store.upsert_if_unprocessed(projection, marker).await?;

        if !applied {
            tracing::info!(event_id = %meta.event_id, "skipping duplicate event");
            metrics::counter!("projection_duplicates_skipped").increment(1);
            return Ok(ApplyOutcome::Duplicate);
        }

        tracing::info!(
            order_id = %fields.order_id,
            event_id = %meta.event_id,
            version = meta.version,
            "upserted order projection"
        );
        metrics::counter!("projection_events_applied").increment(1);

        Ok(ApplyOutcome::Applied)
    }
}

#[async_trait]
impl ConsumedEventHandler for OrderProjector {
    async fn handle(&self, context: ConsumedEventContext) -> std::result::Result<(), HandlerError> {
        self.apply(&context).await?;
        Ok(())
    }
}

struct EnvelopeMeta {
    event_id: EventId,
    event_type: String,
    version: i32,
}

fn envelope_meta<P>(envelope: &EventEnvelope<P>) -> EnvelopeMeta {
    EnvelopeMeta {
        event_id: envelope.event_id,
        event_type: envelope.event_type.clone(),
        version: envelope.version,
    }
}

struct OrderFields {
    order_id: String,
    customer_id: String,
    amount: Decimal,
    currency: String,
    created_at: DateTime<FixedOffset>,
    source_system: Option<String>,
}
