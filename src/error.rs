// src/error.rs
// Error taxonomy for story generation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryError {
    #[error("provider rate limit persisted after {attempts} attempts")]
    UpstreamRateLimited { attempts: u32 },

    #[error("provider request failed: {0}")]
    UpstreamTransport(String),

    #[error("unexpected provider response: {0}")]
    MalformedResponse(String),

    #[error("prompt does not ask for a story")]
    InvalidPrompt,

    #[error("description has {found} paragraphs, at least {required} required")]
    InsufficientContent { found: usize, required: usize },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("upload error: {0}")]
    Upload(String),

    #[error("image download failed: {0}")]
    ImageFetch(String),

    #[error("PDF assembly failed: {0}")]
    Pdf(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Result using StoryError
pub type Result<T> = std::result::Result<T, StoryError>;

impl From<lopdf::Error> for StoryError {
    fn from(err: lopdf::Error) -> Self {
        StoryError::Pdf(err.to_string())
    }
}

impl From<image::ImageError> for StoryError {
    fn from(err: image::ImageError) -> Self {
        StoryError::Pdf(format!("image decode: {err}"))
    }
}
