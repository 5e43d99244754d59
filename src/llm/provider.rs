// src/llm/provider.rs
// Capability contract of the generative-AI provider

use async_trait::async_trait;

use crate::error::Result;

/// Text, image and vision capabilities the orchestrator depends on.
#[async_trait]
pub trait StoryProvider: Send + Sync {
    /// Generate a short story from a prompt
    async fn generate_story(&self, prompt: &str) -> Result<String>;

    /// Summarize a story in a sentence or two
    async fn summarize(&self, story: &str) -> Result<String>;

    /// Generate one square illustration, returning its provider-hosted URL
    async fn generate_image(&self, prompt: &str) -> Result<String>;

    /// Narrate an image as a multi-paragraph story
    async fn describe_image(&self, image: &[u8], mime: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}
