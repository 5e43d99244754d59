// src/api/http/chat.rs
// Story creation and regeneration endpoints

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::common::json_body;
use crate::api::error::{ApiError, ApiResult};
use crate::content::non_blank;
use crate::services::GenerationResult;
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateStoryRequest {
    #[serde(default)]
    pub story: String,
    pub regenerate_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateStoryResponse {
    pub new_story: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateImageRequest {
    #[serde(default)]
    pub summary: String,
    pub regenerate_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateImageResponse {
    pub new_image_url: String,
}

/// POST /api/chat
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<GenerationResult>> {
    let request = json_body(payload)?;
    let message = non_blank(Some(&request.message))
        .ok_or_else(|| ApiError::bad_request("message is required"))?;

    info!("Story requested ({} chars)", message.len());
    let result = app_state.story_service.create_story(message).await?;

    Ok(Json(result))
}

/// POST /api/regenerate-story
pub async fn regenerate_story_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<RegenerateStoryRequest>, JsonRejection>,
) -> ApiResult<Json<RegenerateStoryResponse>> {
    let request = json_body(payload)?;

    let new_story = app_state
        .story_service
        .regenerate_story(&request.story, request.regenerate_prompt.as_deref())
        .await?;

    Ok(Json(RegenerateStoryResponse { new_story }))
}

/// POST /api/regenerate-image
pub async fn regenerate_image_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<RegenerateImageRequest>, JsonRejection>,
) -> ApiResult<Json<RegenerateImageResponse>> {
    let request = json_body(payload)?;

    let new_image_url = app_state
        .story_service
        .regenerate_image(&request.summary, request.regenerate_prompt.as_deref())
        .await?;

    Ok(Json(RegenerateImageResponse { new_image_url }))
}
