//! Projection error types.

use thiserror::Error;

/// Errors that can occur while decoding or applying events.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Codec resolution or envelope decoding failed.
    #[error("messaging error: {0}")]
    Messaging(#[from] messaging::MessagingError),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
