//! In-memory projection store for tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::EventId;
use tokio::sync::RwLock;

use crate::Result;
use crate::read_model::{OrderProjection, ProcessedEventMarker};
use crate::store::ProjectionStore;

/// In-memory implementation of [`ProjectionStore`].
///
/// Provides the same contract as the PostgreSQL implementation; the write
/// lock held across check-insert-upsert stands in for the transaction.
#[derive(Clone, Default)]
pub struct InMemoryProjectionStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    orders: HashMap<String, OrderProjection>,
    processed: HashMap<EventId, ProcessedEventMarker>,
}

impl InMemoryProjectionStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of projection rows.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Returns the number of ledger rows.
    pub async fn processed_count(&self) -> usize {
        self.inner.read().await.processed.len()
    }

    /// Returns every projection row, for test assertions.
    pub async fn all_orders(&self) -> Vec<OrderProjection> {
        let mut orders: Vec<_> = self.inner.read().await.orders.values().cloned().collect();
        orders.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        orders
    }
}

#[async_trait]
impl ProjectionStore for InMemoryProjectionStore {
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderProjection>> {
        Ok(self.inner.read().await.orders.get(order_id).cloned())
    }

    async fn upsert_if_unprocessed(
        &self,
        projection: OrderProjection,
        marker: ProcessedEventMarker,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;

        if inner.processed.contains_key(&marker.event_id) {
            return Ok(false);
        }

        inner.processed.insert(marker.event_id, marker);
        inner.orders.insert(projection.order_id.clone(), projection);
        Ok(true)
    }

    async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.orders.clear();
        inner.processed.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn sample(order_id: &str, event_id: EventId) -> (OrderProjection, ProcessedEventMarker) {
        let projection = OrderProjection {
            order_id: order_id.to_string(),
            customer_id: "acme".to_string(),
            amount: Decimal::new(1050, 2),
            currency: "USD".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            source_system: None,
            last_event_version: 1,
            last_event_id: event_id,
        };
        let marker = ProcessedEventMarker {
            event_id,
            event_type: "order.created".to_string(),
            version: 1,
            partition_id: "0".to_string(),
            offset: Some(1),
            processed_at: Utc::now(),
        };
        (projection, marker)
    }

    #[tokio::test]
    async fn applies_then_rejects_duplicate() {
        let store = InMemoryProjectionStore::new();
        let event_id = EventId::new();
        let (projection, marker) = sample("order-1", event_id);

        assert!(
            store
                .upsert_if_unprocessed(projection.clone(), marker.clone())
                .await
                .unwrap()
        );
        assert!(
            !store
                .upsert_if_unprocessed(projection, marker)
                .await
                .unwrap()
        );

        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.processed_count().await, 1);
    }

    #[tokio::test]
    async fn distinct_events_update_the_same_order() {
        let store = InMemoryProjectionStore::new();

        let first = EventId::new();
        let (projection, marker) = sample("order-1", first);
        store.upsert_if_unprocessed(projection, marker).await.unwrap();

        let second = EventId::new();
        let (mut projection, marker) = sample("order-1", second);
        projection.amount = Decimal::new(9999, 2);
        store.upsert_if_unprocessed(projection, marker).await.unwrap();

        let order = store.get_order("order-1").await.unwrap().unwrap();
        assert_eq!(order.amount, Decimal::new(9999, 2));
        assert_eq!(order.last_event_id, second);
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.processed_count().await, 2);
    }

    #[tokio::test]
    async fn reset_clears_both_tables() {
        let store = InMemoryProjectionStore::new();
        let (projection, marker) = sample("order-1", EventId::new());
        store.upsert_if_unprocessed(projection, marker).await.unwrap();

        store.reset().await.unwrap();

        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.processed_count().await, 0);
    }
}
