// src/api/http/common.rs
// Shared request helpers for HTTP handlers

use axum::{Json, extract::rejection::JsonRejection};

use crate::api::error::{ApiError, ApiResult};

/// Unwrap a JSON body, turning malformed payloads into a JSON 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    })
}
