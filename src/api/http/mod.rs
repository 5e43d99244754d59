// src/api/http/mod.rs

pub mod chat;
pub mod common;
pub mod describe;
pub mod handlers;
pub mod pdf;
pub mod router;

pub use router::{app_router, http_router};
