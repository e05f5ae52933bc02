//! Order publish and read-model query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use contracts::api::{
    CreateOrderRequest, CreateOrdersBulkRequest, OrderReadModelResponse, PublishOrderResponse,
};
use projections::{OrderProjection, ProjectionStore};

use crate::error::ApiError;
use crate::service::OrderCommandService;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub commands: OrderCommandService,
    pub store: Arc<dyn ProjectionStore>,
}

/// POST /orders — publish one order-created event.
#[tracing::instrument(skip(state, request))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<PublishOrderResponse>), ApiError> {
    let response = state.commands.publish_order(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /orders/bulk — publish several order-created events sequentially.
#[tracing::instrument(skip(state, request))]
pub async fn create_bulk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateOrdersBulkRequest>,
) -> Result<(StatusCode, Json<Vec<PublishOrderResponse>>), ApiError> {
    let responses = state.commands.publish_bulk(request.orders).await?;
    Ok((StatusCode::CREATED, Json(responses)))
}

/// GET /orders/:id — query the denormalized read model by order id.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderReadModelResponse>, ApiError> {
    let order = state
        .store
        .get_order(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;

    Ok(Json(to_response(order)))
}

fn to_response(order: OrderProjection) -> OrderReadModelResponse {
    OrderReadModelResponse {
        order_id: order.order_id,
        customer_id: order.customer_id,
        amount: order.amount,
        currency: order.currency,
        created_at: order.created_at,
        updated_at: order.updated_at,
        source_system: order.source_system,
        last_event_version: order.last_event_version,
        last_event_id: order.last_event_id,
    }
}
