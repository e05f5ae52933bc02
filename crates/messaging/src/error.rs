//! Messaging error types.

use thiserror::Error;

/// Boxed error returned by consumed-event handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by codecs, transports, and consumption loops.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// No codec is registered under the requested format name.
    #[error("no serializer registered for format '{0}'")]
    UnknownFormat(String),

    /// JSON envelope/payload bytes do not match the declared schema.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary envelope bytes do not match the fixed record schema.
    #[error("binary codec error: {0}")]
    BinaryDecode(#[from] prost::DecodeError),

    /// A decoded envelope field failed validation (UUID, timestamp).
    #[error("invalid envelope field {field}: {message}")]
    InvalidField { field: &'static str, message: String },

    /// The broker client reported a non-retryable send failure.
    #[error("publish failed: {0}")]
    Publish(String),

    /// A single envelope does not fit the transport's size-limited unit.
    #[error("event of {size} bytes exceeds the transport limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },

    /// Transport-level failure outside the publish path (connect, subscribe,
    /// receive, commit).
    #[error("transport error: {0}")]
    Transport(String),

    /// The consumer was started twice; construct a new instance to restart.
    #[error("consumer already started; a stopped consumer cannot be restarted")]
    AlreadyStarted,

    /// The supplied event handler failed; consumption fails fast.
    #[error("event handler failed: {0}")]
    Handler(#[source] HandlerError),
}

/// Result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;
