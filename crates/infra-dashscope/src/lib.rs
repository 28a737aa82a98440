// Panelcraft Infrastructure - DashScope Adapter
// Implements: ContentService (text analysis + image generation over HTTP)

mod client;
mod error;
mod prompts;
mod service;
mod wire;

pub use client::{DashScopeClient, DashScopeConfig, ImageJob, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::DashScopeError;
pub use service::DashScopeContentService;

// Note: DashScopeError -> ContentError conversion lives in `error`; core never
// sees reqwest types
