// src/api/http/describe.rs
// Image narration endpoint (multipart upload)

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

const FALLBACK_MIME: &str = "image/jpeg";

#[derive(Debug, Deserialize, Serialize)]
pub struct DescribeImageResponse {
    pub description: String,
}

struct Upload {
    bytes: Vec<u8>,
    mime: String,
}

/// POST /api/describe-image
pub async fn describe_image_handler(
    State(app_state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<DescribeImageResponse>> {
    let multipart = multipart
        .map_err(|e| ApiError::upload(format!("Expected multipart upload: {}", e.body_text())))?;

    let upload = read_image_field(multipart)
        .await?
        .ok_or_else(|| ApiError::upload(format!("No file uploaded in field '{IMAGE_FIELD}'")))?;

    info!("Describing uploaded image ({} bytes, {})", upload.bytes.len(), upload.mime);
    let description = app_state
        .story_service
        .describe_image(&upload.bytes, &upload.mime)
        .await?;

    Ok(Json(DescribeImageResponse { description }))
}

async fn read_image_field(mut multipart: Multipart) -> ApiResult<Option<Upload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::upload(format!("Malformed multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let mime = upload_mime(field.content_type(), field.file_name())?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::upload(format!("Failed to read upload: {}", e.body_text())))?;

        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Upload {
            bytes: bytes.to_vec(),
            mime,
        }));
    }

    Ok(None)
}

/// Declared content type, else a guess from the filename, else JPEG.
fn upload_mime(content_type: Option<&str>, file_name: Option<&str>) -> ApiResult<String> {
    let declared = content_type.filter(|ct| !ct.is_empty() && *ct != "application/octet-stream");
    let mime = declared
        .or_else(|| file_name.and_then(|name| mime_guess::from_path(name).first_raw()))
        .unwrap_or(FALLBACK_MIME);
    if !mime.starts_with("image/") {
        return Err(ApiError::upload(format!("Uploaded file is not an image ({mime})")));
    }
    Ok(mime.to_string())
}
