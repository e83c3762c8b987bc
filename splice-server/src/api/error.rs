//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use splice_engine::EngineError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// Generation or validation could not produce an acceptable result
    Unprocessable(String),
    /// An upstream API or the oracle failed
    BadGateway(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadGateway(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::ConfigNotFound(_) => ApiError::NotFound(message),
            EngineError::InvalidPipeline(_) | EngineError::WrongKind { .. } => {
                ApiError::BadRequest(message)
            }
            EngineError::GenerationExhausted { .. }
            | EngineError::ValidationFailure(_)
            | EngineError::MalformedOutput(_)
            | EngineError::Expression(_) => ApiError::Unprocessable(message),
            EngineError::CallFailure { .. } | EngineError::OracleFailure(_) => {
                ApiError::BadGateway(message)
            }
            EngineError::StoreFailure(_) => ApiError::InternalError(message),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
