// src/llm/mod.rs

pub mod client;
pub mod http_client;
pub mod provider;
pub mod types;

pub use client::OpenAIClient;
pub use http_client::LlmHttpClient;
pub use provider::StoryProvider;
