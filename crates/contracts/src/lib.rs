//! Wire contracts shared by publishers, consumers, and the HTTP surface.
//!
//! - [`EventEnvelope`] — versioned envelope wrapping a typed payload with
//!   identity, correlation, and partitioning metadata
//! - [`OrderCreatedV1`] / [`OrderCreatedV2`] — payload schemas per version
//! - [`api`] — request/response DTOs for the command and query endpoints

pub mod api;
pub mod envelope;
pub mod events;

pub use envelope::EventEnvelope;
pub use events::{ORDER_CREATED, OrderCreatedV1, OrderCreatedV2};
