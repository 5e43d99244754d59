// src/document/mod.rs
// Story export: image staging and PDF assembly

pub mod fetch;
pub mod pdf;

pub use fetch::{StagedImage, fetch_image};
pub use pdf::build_pdf;
