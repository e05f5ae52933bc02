//! HTTP surface tests over the in-memory store and a capturing publisher.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use common::EventId;
use messaging::{CodecRegistry, EventPublisher, OutboundEvent, Result as MessagingResult};
use projections::{InMemoryProjectionStore, OrderProjection, ProcessedEventMarker, ProjectionStore};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tower::ServiceExt;

#[derive(Default)]
struct CapturingPublisher {
    published: Mutex<Vec<OutboundEvent>>,
}

#[async_trait]
impl EventPublisher for CapturingPublisher {
    async fn publish(&self, event: OutboundEvent) -> MessagingResult<()> {
        self.published.lock().await.push(event);
        Ok(())
    }
}

fn test_app(store: InMemoryProjectionStore) -> (axum::Router, Arc<CapturingPublisher>) {
    let publisher = Arc::new(CapturingPublisher::default());
    let state = Arc::new(api::AppState {
        commands: api::OrderCommandService::new(publisher.clone(), CodecRegistry::default()),
        store: Arc::new(store),
    });
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle();
    (api::create_app(state, metrics_handle), publisher)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_responds_ok() {
    let (app, _) = test_app(InMemoryProjectionStore::new());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn publish_order_returns_event_metadata() {
    let (app, publisher) = test_app(InMemoryProjectionStore::new());

    let response = app
        .oneshot(post_json(
            "/orders",
            serde_json::json!({
                "customerId": "ACME",
                "amount": "100.50",
                "currency": "USD"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["eventType"], "order.created");
    assert_eq!(json["version"], 1);
    assert_eq!(json["partitionKey"], "acme");
    assert_eq!(json["payloadFormat"], "json");
    assert_eq!(publisher.published.lock().await.len(), 1);
}

#[tokio::test]
async fn blank_customer_is_a_bad_request() {
    let (app, publisher) = test_app(InMemoryProjectionStore::new());

    let response = app
        .oneshot(post_json(
            "/orders",
            serde_json::json!({
                "customerId": "  ",
                "amount": "10.00",
                "currency": "USD"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(publisher.published.lock().await.is_empty());
}

#[tokio::test]
async fn bulk_publish_returns_one_response_per_order() {
    let (app, publisher) = test_app(InMemoryProjectionStore::new());

    let response = app
        .oneshot(post_json(
            "/orders/bulk",
            serde_json::json!({
                "orders": [
                    {"customerId": "acme", "amount": "1.00", "currency": "USD"},
                    {"customerId": "globex", "amount": "2.00", "currency": "EUR", "useV2": true}
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[1]["version"], 2);
    assert_eq!(publisher.published.lock().await.len(), 2);
}

#[tokio::test]
async fn query_returns_projection_row() {
    let store = InMemoryProjectionStore::new();
    let event_id = EventId::new();
    store
        .upsert_if_unprocessed(
            OrderProjection {
                order_id: "order-1".to_string(),
                customer_id: "acme".to_string(),
                amount: Decimal::new(10050, 2),
                currency: "USD".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                source_system: Some("legacy".to_string()),
                last_event_version: 1,
                last_event_id: event_id,
            },
            ProcessedEventMarker {
                event_id,
                event_type: "order.created".to_string(),
                version: 1,
                partition_id: "0".to_string(),
                offset: Some(1),
                processed_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    let (app, _) = test_app(store);
    let response = app
        .oneshot(Request::get("/orders/order-1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["orderId"], "order-1");
    assert_eq!(json["amount"], "100.50");
    assert_eq!(json["sourceSystem"], "legacy");
    assert_eq!(json["lastEventVersion"], 1);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let (app, _) = test_app(InMemoryProjectionStore::new());
    let response = app
        .oneshot(Request::get("/orders/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
