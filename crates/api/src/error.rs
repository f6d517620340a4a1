//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Artifacts were not loaded at startup
    #[error("Prediction is unavailable: model artifacts are not loaded")]
    PredictionUnavailable,
    /// Strict validation rejected the input
    #[error("Invalid input")]
    InvalidInput(Vec<String>),
    /// Encode, scale or predict failed
    #[error("Prediction failed")]
    PredictionFailed,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::PredictionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PredictionFailed => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error = self.to_string();
        let details = match self {
            ApiError::InvalidInput(details) => details,
            _ => Vec::new(),
        };
        (status, Json(ErrorBody { error, details })).into_response()
    }
}
