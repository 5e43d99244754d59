// src/llm/client.rs
// OpenAI-compatible provider client: story, summary, illustration, image narration

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::config::StoryConfig;
use crate::content::count_paragraphs;
use crate::error::{Result, StoryError};
use crate::llm::http_client::LlmHttpClient;
use crate::llm::provider::StoryProvider;
use crate::llm::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart,
    ImageGenerationRequest, ImageGenerationResponse, ImageUrl,
};

const STORY_SYSTEM_PROMPT: &str = "You are a creative storyteller. Write an engaging, \
self-contained short story for the request you receive. Use plain prose separated into \
paragraphs by blank lines, with no title and no headings.";

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize stories. Reply with one or two \
sentences that capture the main character, setting and event of the story.";

#[derive(Clone)]
pub struct OpenAIClient {
    http: LlmHttpClient,
    api_key: String,
    chat_url: String,
    images_url: String,
    text_model: String,
    vision_model: String,
    image_model: String,
    image_size: String,
    story_max_tokens: u32,
    summary_max_tokens: u32,
    describe_max_tokens: u32,
    min_description_paragraphs: usize,
}

impl OpenAIClient {
    /// Build a client from configuration, sharing `client`'s connection pool.
    pub fn from_config(config: &StoryConfig, client: Client) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| StoryError::Config("OPENAI_API_KEY must be set".to_string()))?;

        let http = LlmHttpClient::from_client(client)
            .with_retry_policy(config.rate_limit_max_attempts, config.retry_base());

        debug!(
            "Initialized provider client: base_url={}, text_model={}, image_model={}",
            config.openai_base_url, config.text_model, config.image_model
        );

        Ok(Self {
            http,
            api_key,
            chat_url: config.openai_api_url("chat/completions"),
            images_url: config.openai_api_url("images/generations"),
            text_model: config.text_model.clone(),
            vision_model: config.vision_model.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
            story_max_tokens: config.story_max_tokens,
            summary_max_tokens: config.summary_max_tokens,
            describe_max_tokens: config.describe_max_tokens,
            min_description_paragraphs: config.min_description_paragraphs,
        })
    }

    async fn complete(
        &self,
        request_id: &str,
        request: &ChatCompletionRequest<'_>,
        retry: bool,
    ) -> Result<String> {
        let response: ChatCompletionResponse = if retry {
            self.http
                .post_json_with_retry(request_id, &self.chat_url, &self.api_key, request)
                .await?
        } else {
            self.http
                .post_json(request_id, &self.chat_url, &self.api_key, request)
                .await?
        };

        response
            .first_content()
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| StoryError::MalformedResponse("completion has no content".to_string()))
    }
}

#[async_trait]
impl StoryProvider for OpenAIClient {
    async fn generate_story(&self, prompt: &str) -> Result<String> {
        let request_id = format!("story-{}", Uuid::new_v4());
        info!(request_id = %request_id, model = %self.text_model, "Generating story");

        let request = ChatCompletionRequest {
            model: &self.text_model,
            messages: vec![
                ChatMessage::system(STORY_SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            max_tokens: self.story_max_tokens,
            temperature: Some(0.8),
        };

        let story = self.complete(&request_id, &request, true).await?;
        Ok(story.trim().to_string())
    }

    async fn summarize(&self, story: &str) -> Result<String> {
        let request_id = format!("summary-{}", Uuid::new_v4());
        info!(request_id = %request_id, story_chars = story.len(), "Summarizing story");

        let request = ChatCompletionRequest {
            model: &self.text_model,
            messages: vec![
                ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
                ChatMessage::user(story),
            ],
            max_tokens: self.summary_max_tokens,
            temperature: Some(0.3),
        };

        let summary = self.complete(&request_id, &request, true).await?;
        Ok(summary.trim().to_string())
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request_id = format!("image-{}", Uuid::new_v4());
        info!(
            request_id = %request_id,
            model = %self.image_model,
            size = %self.image_size,
            "Generating image"
        );

        let request = ImageGenerationRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: &self.image_size,
        };

        let response: ImageGenerationResponse = self
            .http
            .post_json_with_retry(&request_id, &self.images_url, &self.api_key, &request)
            .await?;

        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| StoryError::MalformedResponse("no image returned".to_string()))?;

        if let Some(revised) = &image.revised_prompt {
            debug!(request_id = %request_id, "Provider revised image prompt: {}", revised);
        }

        let url = image
            .url
            .ok_or_else(|| StoryError::MalformedResponse("image has no url".to_string()))?;

        match Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(url),
            _ => Err(StoryError::MalformedResponse(format!("invalid image url: {url}"))),
        }
    }

    async fn describe_image(&self, image: &[u8], mime: &str) -> Result<String> {
        let request_id = format!("describe-{}", Uuid::new_v4());
        info!(request_id = %request_id, bytes = image.len(), mime = %mime, "Describing image");

        let required = self.min_description_paragraphs;
        let instruction = format!(
            "Tell a story inspired by this image in at least {required} paragraphs. \
             Separate each paragraph with a blank line."
        );
        let data_url = format!("data:{mime};base64,{}", BASE64.encode(image));

        let request = ChatCompletionRequest {
            model: &self.vision_model,
            messages: vec![ChatMessage::user_parts(vec![
                ContentPart::Text { text: instruction },
                ContentPart::ImageUrl { image_url: ImageUrl { url: data_url } },
            ])],
            max_tokens: self.describe_max_tokens,
            temperature: None,
        };

        let description = self.complete(&request_id, &request, false).await?;

        let found = count_paragraphs(&description);
        if found < required {
            return Err(StoryError::InsufficientContent { found, required });
        }

        Ok(description)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
