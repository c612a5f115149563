use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use stockpile_core::envelope::ErrorEnvelope;
use thiserror::Error;

/// Infrastructure-level failures on the request path
///
/// Contract rejections (validation, not-found, permission, conflict) never
/// pass through here; handlers turn those into envelopes directly so their
/// details survive verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<stockpile_core::Error> for AppError {
    fn from(error: stockpile_core::Error) -> Self {
        Self::Internal(error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, envelope) = match &self {
            Self::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorEnvelope::unauthorized(message.clone()),
            ),
            Self::Config(message) | Self::Internal(message) => {
                // Internal detail is logged here and never leaks to the client
                tracing::error!("Request failed: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorEnvelope::internal())
            }
        };
        (status, Json(envelope)).into_response()
    }
}

/// Build a response from a contract-rejection envelope
pub fn envelope_response(envelope: ErrorEnvelope) -> Response {
    let status = StatusCode::from_u16(envelope.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}
