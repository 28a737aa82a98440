// Remote Content Service Port
// Text analysis and image rendering behind one async interface

use crate::domain::{
    CharacterReference, ComicStyle, GeneratedImage, ImageOptions, PageDraft, Scene,
};
use crate::port::ApiKey;
use async_trait::async_trait;
use thiserror::Error;

/// Free text to be split into scenes or pages
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub text: String,
    pub api_key: ApiKey,
}

/// Render one scene as a single panel
#[derive(Debug, Clone)]
pub struct PanelRequest {
    pub scene: Scene,
    pub references: Vec<CharacterReference>,
    pub style: ComicStyle,
    pub options: ImageOptions,
    pub api_key: ApiKey,
}

/// Render several scenes composed into one page
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page_number: u32,
    pub title: String,
    pub scenes: Vec<Scene>,
    pub references: Vec<CharacterReference>,
    pub style: ComicStyle,
    pub options: ImageOptions,
    pub api_key: ApiKey,
}

/// Render a front/side/back character sheet
#[derive(Debug, Clone)]
pub struct CharacterSheetRequest {
    pub name: String,
    pub description: String,
    pub style: ComicStyle,
    /// Optional user-supplied picture the sheet should stay faithful to
    pub reference_image: Option<String>,
    pub options: ImageOptions,
    pub api_key: ApiKey,
}

/// Remote failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Credential rejected: {0}")]
    Unauthorized(String),

    #[error("Provider returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Remote Content Service
///
/// Implementations:
/// - DashScopeContentService: HTTP adapter (infra-dashscope crate)
/// - MockContentService: scripted responses for tests
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Split text into independent scenes (single-panel mode)
    async fn analyze_scenes(&self, req: AnalyzeRequest) -> Result<Vec<Scene>, ContentError>;

    /// Split text into pages of consecutive scenes (multi-panel mode)
    async fn analyze_pages(&self, req: AnalyzeRequest) -> Result<Vec<PageDraft>, ContentError>;

    async fn render_panel(&self, req: PanelRequest) -> Result<GeneratedImage, ContentError>;

    async fn render_page(&self, req: PageRequest) -> Result<GeneratedImage, ContentError>;

    async fn render_character_sheet(
        &self,
        req: CharacterSheetRequest,
    ) -> Result<GeneratedImage, ContentError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// One recorded render call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RenderCall {
        pub kind: &'static str,
        /// Scene description, page title or character name
        pub label: String,
        pub references: Vec<CharacterReference>,
    }

    /// Mock content service.
    ///
    /// Analysis returns the scripted scenes/pages. A render fails when its
    /// label contains one of the configured failure markers, otherwise it
    /// returns `mock://<kind>/<label>` after the configured delay.
    #[derive(Default)]
    pub struct MockContentService {
        scenes: Mutex<Vec<Scene>>,
        pages: Mutex<Vec<PageDraft>>,
        fail_markers: Mutex<Vec<String>>,
        delay: Mutex<Duration>,
        calls: Mutex<Vec<RenderCall>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockContentService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_scenes(self, scenes: Vec<Scene>) -> Self {
            *self.scenes.lock().unwrap() = scenes;
            self
        }

        pub fn with_pages(self, pages: Vec<PageDraft>) -> Self {
            *self.pages.lock().unwrap() = pages;
            self
        }

        pub fn with_delay(self, delay: Duration) -> Self {
            *self.delay.lock().unwrap() = delay;
            self
        }

        pub fn fail_when_contains(self, marker: impl Into<String>) -> Self {
            self.fail_markers.lock().unwrap().push(marker.into());
            self
        }

        pub fn calls(&self) -> Vec<RenderCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Highest number of renders observed in flight at once
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        async fn render(
            &self,
            kind: &'static str,
            label: String,
            references: Vec<CharacterReference>,
        ) -> Result<GeneratedImage, ContentError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(RenderCall {
                kind,
                label: label.clone(),
                references,
            });

            let delay = *self.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            } else {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let fails = self
                .fail_markers
                .lock()
                .unwrap()
                .iter()
                .any(|marker| label.contains(marker.as_str()));
            if fails {
                return Err(ContentError::Rejected {
                    status: 500,
                    message: format!("mock failure for {label}"),
                });
            }
            Ok(GeneratedImage::new(format!("mock://{kind}/{label}")))
        }
    }

    #[async_trait]
    impl ContentService for MockContentService {
        async fn analyze_scenes(&self, req: AnalyzeRequest) -> Result<Vec<Scene>, ContentError> {
            if req.text.trim().is_empty() {
                return Err(ContentError::InvalidRequest("empty text".into()));
            }
            Ok(self.scenes.lock().unwrap().clone())
        }

        async fn analyze_pages(
            &self,
            req: AnalyzeRequest,
        ) -> Result<Vec<PageDraft>, ContentError> {
            if req.text.trim().is_empty() {
                return Err(ContentError::InvalidRequest("empty text".into()));
            }
            Ok(self.pages.lock().unwrap().clone())
        }

        async fn render_panel(&self, req: PanelRequest) -> Result<GeneratedImage, ContentError> {
            self.render("panel", req.scene.description, req.references)
                .await
        }

        async fn render_page(&self, req: PageRequest) -> Result<GeneratedImage, ContentError> {
            self.render("page", req.title, req.references).await
        }

        async fn render_character_sheet(
            &self,
            req: CharacterSheetRequest,
        ) -> Result<GeneratedImage, ContentError> {
            self.render("sheet", req.name, Vec::new()).await
        }
    }
}
