//! Storage contract for the read model and its ledger.

use async_trait::async_trait;

use crate::Result;
use crate::read_model::{OrderProjection, ProcessedEventMarker};

/// Atomic check-and-apply storage for projections.
///
/// `upsert_if_unprocessed` is the pipeline's single critical section: the
/// ledger check, the marker insert, and the projection upsert execute as one
/// all-or-nothing unit. Concurrent deliveries of the same event id may race,
/// but losing the race is safe — the loser's apply is discarded whole.
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Fetches a projection by order id.
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderProjection>>;

    /// Applies the projection and marker atomically unless the event was
    /// already processed.
    ///
    /// Returns `false` when nothing was applied: the marker already existed,
    /// or a concurrent writer won the race for it. No partial state is ever
    /// visible in either case.
    async fn upsert_if_unprocessed(
        &self,
        projection: OrderProjection,
        marker: ProcessedEventMarker,
    ) -> Result<bool>;

    /// Administrative reset: drops every projection and ledger row.
    async fn reset(&self) -> Result<()>;
}
