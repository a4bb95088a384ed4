use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Error taxonomy for the risk core and its HTTP surface.
///
/// Nothing here is process-fatal: every variant is recoverable at the
/// request boundary. `SummarizationUnavailable` is normally recovered
/// inside the analysis pipeline (the ranking is returned without a
/// summary) and only surfaces if a handler propagates it directly.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Watch session not found: {0}")]
    SessionNotFound(String),

    #[error("Summarization unavailable: {0}")]
    SummarizationUnavailable(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DataUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::SessionNotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::SummarizationUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::ExternalServiceError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::InternalError(err) => {
                tracing::error!("Internal error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.clone())
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}
