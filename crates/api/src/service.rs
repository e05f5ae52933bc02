//! Order command service: validated requests become published envelopes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::OrderId;
use contracts::api::{CreateOrderRequest, PublishOrderResponse};
use contracts::{EventEnvelope, ORDER_CREATED, OrderCreatedV1, OrderCreatedV2};
use messaging::{
    CodecRegistry, EventPublisher, OutboundEvent, resolve_order_partition_key,
};
use rust_decimal::Decimal;

use crate::error::ApiError;

/// Source system recorded on v2 events when the caller does not name one.
const DEFAULT_SOURCE_SYSTEM: &str = "order-api";

/// Builds and publishes order-created envelopes from validated requests.
pub struct OrderCommandService {
    publisher: Arc<dyn EventPublisher>,
    codecs: CodecRegistry,
}

impl OrderCommandService {
    pub fn new(publisher: Arc<dyn EventPublisher>, codecs: CodecRegistry) -> Self {
        Self { publisher, codecs }
    }

    /// Publishes one order-created event, v1 or v2 per the request.
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn publish_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<PublishOrderResponse, ApiError> {
        validate(&request)?;

        let codec = self.codecs.default_codec()?;
        let order_id = request
            .order_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(OrderId::from_string)
            .unwrap_or_default();
        let partition_key = resolve_order_partition_key(&request.customer_id);
        let created_at = Utc::now().fixed_offset();

        let event = if request.use_v2 {
            let payload = OrderCreatedV2 {
                order_id: order_id.to_string(),
                customer_id: request.customer_id.clone(),
                amount: request.amount,
                currency: request.currency.clone(),
                created_at,
                created_by: "api".to_string(),
                source_system: request
                    .source_system
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SOURCE_SYSTEM.to_string()),
                attributes: Some(HashMap::from([(
                    "origin".to_string(),
                    "order-api".to_string(),
                )])),
            };
            let envelope = EventEnvelope::create(
                ORDER_CREATED,
                2,
                partition_key,
                payload,
                request.correlation_id.clone(),
            );
            OutboundEvent::pack(&envelope, codec)?
        } else {
            let payload = OrderCreatedV1 {
                order_id: order_id.to_string(),
                customer_id: request.customer_id.clone(),
                amount: request.amount,
                currency: request.currency.clone(),
                created_at,
                created_by: "api".to_string(),
            };
            let envelope = EventEnvelope::create(
                ORDER_CREATED,
                1,
                partition_key,
                payload,
                request.correlation_id.clone(),
            );
            OutboundEvent::pack(&envelope, codec)?
        };

        let response = PublishOrderResponse {
            order_id: order_id.to_string(),
            event_id: event.event_id,
            event_type: event.event_type.clone(),
            version: event.version,
            partition_key: event.partition_key.clone(),
            payload_format: event.payload_format.to_string(),
        };

        self.publisher.publish(event).await?;
        Ok(response)
    }

    /// Publishes a batch of orders sequentially.
    ///
    /// A failure aborts the remainder; already-published events stay
    /// published (the broker is an append-only log).
    pub async fn publish_bulk(
        &self,
        requests: Vec<CreateOrderRequest>,
    ) -> Result<Vec<PublishOrderResponse>, ApiError> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(self.publish_order(request).await?);
        }
        Ok(responses)
    }
}

fn validate(request: &CreateOrderRequest) -> Result<(), ApiError> {
    if request.customer_id.trim().is_empty() {
        return Err(ApiError::Validation("customerId is required".to_string()));
    }
    if request.amount <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    if request.currency.trim().is_empty() {
        return Err(ApiError::Validation("currency is required".to_string()));
    }
    Ok(())
}
