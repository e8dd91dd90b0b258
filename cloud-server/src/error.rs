//! Error handling

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use threatlens_core::{EngineError, FusionError};

pub type AppResult<T> = Result<T, AppError>;

/// Suggested wait before retrying an analysis nobody answered
const INSUFFICIENT_DATA_RETRY_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum AppError {
    // Input errors
    #[error("{0}")]
    Unclassifiable(String),

    #[error("{0}")]
    ValidationError(String),

    // Engine errors
    #[error("no reputation source responded ({queried} queried)")]
    InsufficientData { queried: usize },

    // Client errors
    #[error("rate limit exceeded")]
    RateLimited { retry_after: u64 },

    // Resource errors
    #[error("{0}")]
    NotFound(String),

    // Generic errors
    #[error("{0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self {
            AppError::Unclassifiable(_) | AppError::ValidationError(_) => {
                (StatusCode::BAD_REQUEST, None)
            }
            AppError::InsufficientData { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Some(INSUFFICIENT_DATA_RETRY_SECS),
            ),
            AppError::RateLimited { retry_after } => {
                (StatusCode::TOO_MANY_REQUESTS, Some(*retry_after))
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let error_message = match &self {
            AppError::InternalError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<FusionError> for AppError {
    fn from(err: FusionError) -> Self {
        match err {
            FusionError::UnclassifiableIndicator { .. } => AppError::Unclassifiable(err.to_string()),
            FusionError::InsufficientData { queried } => AppError::InsufficientData { queried },
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Fusion(e) => e.into(),
            EngineError::TooManyIndicators { .. } => AppError::ValidationError(err.to_string()),
            EngineError::Io { .. } => AppError::InternalError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
