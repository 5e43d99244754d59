// src/lib.rs

pub mod api;
pub mod config;
pub mod content;
pub mod document;
pub mod error;
pub mod llm;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

pub use error::{Result, StoryError};
pub use state::{AppState, create_app_state};
