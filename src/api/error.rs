// src/api/error.rs
// Centralized error handling for HTTP API responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

use crate::error::StoryError;

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: &'static str,
}

impl ApiError {
    pub fn new(
        status_code: StatusCode,
        error_code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code,
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal Server Error")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "UPLOAD_ERROR", message)
    }

    pub fn timeout() -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            "REQUEST_TIMEOUT",
            "The request took too long to complete",
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.error_code)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "error_code": self.error_code,
            "status": self.status_code.as_u16(),
        });

        (self.status_code, Json(body)).into_response()
    }
}

/// Map a domain error to its public response. Detail stays in the logs;
/// callers only see the fixed message for each error code.
impl From<StoryError> for ApiError {
    fn from(err: StoryError) -> Self {
        let api_error = match &err {
            StoryError::Validation(msg) => ApiError::bad_request(msg.clone()),
            StoryError::Upload(msg) => ApiError::upload(msg.clone()),
            StoryError::InvalidPrompt => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_PROMPT",
                "Prompt must ask for a story, e.g. \"Tell me a story about...\"",
            ),
            StoryError::UpstreamRateLimited { .. } => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "UPSTREAM_RATE_LIMITED",
                "The AI provider is rate limiting requests, try again later",
            ),
            StoryError::UpstreamTransport(_) | StoryError::MalformedResponse(_) => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "The AI provider request failed",
            ),
            StoryError::InsufficientContent { .. } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "INSUFFICIENT_CONTENT",
                "The image description was too short",
            ),
            StoryError::ImageFetch(_) => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "IMAGE_FETCH_FAILED",
                "The story image could not be downloaded",
            ),
            StoryError::Pdf(_)
            | StoryError::Config(_)
            | StoryError::Io(_)
            | StoryError::Http(_)
            | StoryError::Json(_) => ApiError::internal(),
        };

        if api_error.status_code.is_server_error() {
            error!(error_code = api_error.error_code, "Request failed: {}", err);
        } else {
            warn!(error_code = api_error.error_code, "Request rejected: {}", err);
        }

        api_error
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
