use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use sotto_shared::types::Identity;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Durable append failed. `delivered` records whether live delivery
    /// succeeded before the failure; partial success is a distinct outcome
    /// and must reach the sender.
    #[error("Persistence failure (live delivery succeeded: {delivered}): {source}")]
    Persistence {
        delivered: bool,
        #[source]
        source: StorageError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No public key published for {0}")]
    KeyNotFound(Identity),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RelayError::MessageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            RelayError::Persistence { .. } => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            RelayError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage error".to_string(),
            ),
            RelayError::KeyNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            RelayError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            RelayError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            RelayError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            RelayError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
