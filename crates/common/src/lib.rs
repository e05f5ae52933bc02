//! Shared identifier types for the order event pipeline.

mod types;

pub use types::{EventId, OrderId};
