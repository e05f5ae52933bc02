//! Idempotent projection of order events into a queryable read model.
//!
//! This crate owns the invariant linking the processed-event ledger to the
//! projection table: the two are written as one atomic unit, so a message
//! delivered twice (redelivery, overlapping replay and live consumption,
//! competing consumer instances) mutates the read model exactly once.
//!
//! - [`OrderProjection`] / [`ProcessedEventMarker`] — the two persisted rows
//! - [`ProjectionStore`] — atomic check-and-apply storage contract, with
//!   Postgres and in-memory implementations
//! - [`OrderProjector`] — version-dispatching decode/apply engine shared by
//!   live consumption and replay

pub mod error;
pub mod memory;
pub mod postgres;
pub mod projector;
pub mod read_model;
pub mod store;

pub use error::{ProjectionError, Result};
pub use memory::InMemoryProjectionStore;
pub use postgres::PostgresProjectionStore;
pub use projector::{ApplyOutcome, OrderProjector};
pub use read_model::{OrderProjection, ProcessedEventMarker};
pub use store::ProjectionStore;
