// src/api/http/router.rs
// HTTP router composition for the REST API

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::{
    chat::{chat_handler, regenerate_image_handler, regenerate_story_handler},
    describe::describe_image_handler,
    handlers::health_handler,
    pdf::pdf_handler,
};
use crate::api::error::ApiError;
use crate::state::AppState;

/// API routes, intended to be nested under /api
pub fn http_router(app_state: Arc<AppState>) -> Router {
    let upload_limit = app_state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/pdf", post(pdf_handler))
        .route("/regenerate-story", post(regenerate_story_handler))
        .route("/regenerate-image", post(regenerate_image_handler))
        .route(
            "/describe-image",
            post(describe_image_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(app_state)
}

/// Full application: /api routes plus tracing, timeout and CORS layers
pub fn app_router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config.cors_origin);
    let timeout = app_state.config.server_timeout();

    let api = Router::new()
        .nest("/api", http_router(app_state))
        .layer(TraceLayer::new_for_http());

    with_request_timeout(api, timeout).layer(cors)
}

/// Bound every request; an expired request answers with the JSON error body.
fn with_request_timeout(router: Router, timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, timeout))
        .layer(middleware::map_response(timeout_response))
}

// No handler maps an error to 504, so any 504 here came from the timeout layer.
async fn timeout_response(response: Response) -> Response {
    if response.status() == StatusCode::GATEWAY_TIMEOUT {
        warn!("Request timed out");
        return ApiError::timeout().into_response();
    }
    response
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION]);

    if origin == "*" {
        return cors.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin '{}', allowing any origin", origin);
            cors.allow_origin(Any)
        }
    }
}
