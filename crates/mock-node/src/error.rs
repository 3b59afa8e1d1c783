//! Error responses of the mock node.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure modes of the mock API.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Missing, invalid or expired credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A simulated backend failure.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// JWT signing failed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.to_string();

        tracing::warn!(%status, error = %message, "request failed");
        (status, Json(json!({ "error": message }))).into_response()
    }
}
