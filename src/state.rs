// src/state.rs
// Shared, immutable application state injected into every handler

use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::config::StoryConfig;
use crate::error::Result;
use crate::llm::{OpenAIClient, StoryProvider};
use crate::services::StoryService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StoryConfig>,
    pub story_service: Arc<StoryService>,
}

impl AppState {
    /// Assemble state around an arbitrary provider implementation
    pub fn with_provider(
        config: StoryConfig,
        provider: Arc<dyn StoryProvider>,
        http: Client,
    ) -> Self {
        let story_service = StoryService::new(provider, http, config.scratch_dir.clone())
            .with_max_image_bytes(config.max_image_bytes);
        Self {
            config: Arc::new(config),
            story_service: Arc::new(story_service),
        }
    }
}

/// Build the production state: one pooled HTTP client with explicit
/// timeouts shared by the provider client and image downloads.
pub fn create_app_state(config: StoryConfig) -> Result<AppState> {
    let http = Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .build()?;

    let provider = OpenAIClient::from_config(&config, http.clone())?;

    info!(
        "Provider ready: base_url={}, scratch_dir={}",
        config.openai_base_url,
        config.scratch_dir.display()
    );

    Ok(AppState::with_provider(config, Arc::new(provider), http))
}
