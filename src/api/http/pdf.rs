// src/api/http/pdf.rs
// PDF export endpoint

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::common::json_body;
use crate::api::error::ApiResult;
use crate::state::AppState;

pub const PDF_FILENAME: &str = "story.pdf";

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfRequest {
    #[serde(default)]
    pub story: String,
    pub image_url: Option<String>,
    pub story_name: Option<String>,
}

/// POST /api/pdf
pub async fn pdf_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<PdfRequest>, JsonRejection>,
) -> Response {
    let result: ApiResult<_> = async {
        let request = json_body(payload)?;

        let pdf = app_state
            .story_service
            .export_pdf(
                &request.story,
                request.image_url.as_deref(),
                request.story_name.as_deref().unwrap_or_default(),
            )
            .await?;

        Ok((
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={PDF_FILENAME}"),
                ),
            ],
            pdf,
        ))
    }
    .await;

    match result {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}
