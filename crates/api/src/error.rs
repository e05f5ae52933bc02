//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use messaging::MessagingError;
use projections::ProjectionError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Request validation failed before reaching the pipeline.
    Validation(String),
    /// Resource not found.
    NotFound(String),
    /// Publishing to the broker failed.
    Messaging(MessagingError),
    /// Read model access failed.
    Projection(ProjectionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Messaging(err) => {
                tracing::error!(error = %err, "publish path failed");
                match err {
                    MessagingError::MessageTooLarge { .. } => {
                        (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
                    }
                    _ => (StatusCode::BAD_GATEWAY, err.to_string()),
                }
            }
            ApiError::Projection(err) => {
                tracing::error!(error = %err, "query path failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<MessagingError> for ApiError {
    fn from(err: MessagingError) -> Self {
        ApiError::Messaging(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Projection(err)
    }
}
