// src/services/mod.rs

pub mod story;

pub use story::{GenerationResult, StoryService};
