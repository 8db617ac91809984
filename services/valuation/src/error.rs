use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-level failures. Each maps to one status code and a
/// `{"error": "..."}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API Key")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Prediction failed")]
    PredictionFailed,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PredictionFailed | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Message of an error response, attached as a response extension so the
/// access log can record it without buffering the body.
#[derive(Clone, Debug)]
pub struct ErrorDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let mut response = (self.status(), Json(json!({ "error": message }))).into_response();
        response.extensions_mut().insert(ErrorDetail(message));
        response
    }
}
