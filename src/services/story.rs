// src/services/story.rs
// Orchestrates provider calls: prompt -> story -> summary -> image -> title,
// plus regeneration, image narration and PDF export

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::content::{derive_title, is_story_prompt, non_blank};
use crate::document::{build_pdf, fetch_image};
use crate::error::{Result, StoryError};
use crate::llm::StoryProvider;

/// Everything produced for one story request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub story: String,
    pub summary: String,
    pub image_url: String,
    pub story_name: String,
}

/// Largest illustration `export_pdf` will download, unless overridden
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

pub struct StoryService {
    provider: Arc<dyn StoryProvider>,
    http: Client,
    scratch_dir: PathBuf,
    max_image_bytes: u64,
}

impl StoryService {
    pub fn new(provider: Arc<dyn StoryProvider>, http: Client, scratch_dir: PathBuf) -> Self {
        Self {
            provider,
            http,
            scratch_dir,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: u64) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    /// Validate the prompt, then run story, summary, image and title in order.
    pub async fn create_story(&self, prompt: &str) -> Result<GenerationResult> {
        if !is_story_prompt(prompt) {
            return Err(StoryError::InvalidPrompt);
        }

        info!(provider = self.provider.name(), "Creating story");
        let story = self.provider.generate_story(prompt).await?;
        let summary = self.provider.summarize(&story).await?;
        let image_url = self.provider.generate_image(&summary).await?;
        let story_name = derive_title(&summary);

        info!(
            story_chars = story.len(),
            story_name = %story_name,
            "Story created"
        );

        Ok(GenerationResult {
            story,
            summary,
            image_url,
            story_name,
        })
    }

    /// New story text from an explicit prompt, or a retelling of `story`.
    pub async fn regenerate_story(
        &self,
        story: &str,
        regenerate_prompt: Option<&str>,
    ) -> Result<String> {
        let prompt = match non_blank(regenerate_prompt) {
            Some(prompt) => prompt.to_string(),
            None if !story.trim().is_empty() => retelling_prompt(story),
            None => {
                return Err(StoryError::Validation(
                    "story or regeneratePrompt is required".to_string(),
                ));
            }
        };

        debug!(prompt_chars = prompt.len(), "Regenerating story");
        self.provider.generate_story(&prompt).await
    }

    /// New illustration from an explicit prompt, or from the prior summary.
    pub async fn regenerate_image(
        &self,
        summary: &str,
        regenerate_prompt: Option<&str>,
    ) -> Result<String> {
        let prompt = non_blank(regenerate_prompt)
            .or_else(|| non_blank(Some(summary)))
            .ok_or_else(|| {
                StoryError::Validation("summary or regeneratePrompt is required".to_string())
            })?;

        debug!(prompt_chars = prompt.len(), "Regenerating image");
        self.provider.generate_image(prompt).await
    }

    pub async fn describe_image(&self, image: &[u8], mime: &str) -> Result<String> {
        if image.is_empty() {
            return Err(StoryError::Upload("uploaded image is empty".to_string()));
        }
        self.provider.describe_image(image, mime).await
    }

    /// Assemble the downloadable PDF; the image is fetched when a URL is given.
    pub async fn export_pdf(
        &self,
        story: &str,
        image_url: Option<&str>,
        story_name: &str,
    ) -> Result<Vec<u8>> {
        if story.trim().is_empty() {
            return Err(StoryError::Validation("story is required".to_string()));
        }

        let staged = match non_blank(image_url) {
            Some(url) => {
                let staged =
                    fetch_image(&self.http, url, &self.scratch_dir, self.max_image_bytes).await?;
                Some(staged)
            }
            None => None,
        };

        let title = story_name.to_string();
        let story = story.to_string();
        let pdf = tokio::task::spawn_blocking(move || {
            // `staged` lives until assembly finishes, then its file is removed
            build_pdf(&title, staged.as_ref().map(|s| s.path()), &story)
        })
        .await
        .map_err(|e| StoryError::Pdf(format!("assembly task failed: {e}")))??;

        info!(bytes = pdf.len(), "PDF exported");
        Ok(pdf)
    }
}

fn retelling_prompt(story: &str) -> String {
    format!(
        "Write a story that retells the following one with fresh wording, \
         keeping its characters and setting:\n\n{story}"
    )
}
