// DashScope ContentService Implementation
//
// Every render is two calls: the text model first turns the scene data into
// an English image prompt, then the image model draws it.

use crate::client::{DashScopeClient, ImageJob};
use crate::error::DashScopeError;
use crate::prompts;
use crate::wire::{parse_pages, parse_scenes};
use async_trait::async_trait;
use panelcraft_core::domain::{CharacterReference, GeneratedImage, ImageOptions, PageDraft, Scene};
use panelcraft_core::port::{
    AnalyzeRequest, ApiKey, CharacterSheetRequest, ContentError, ContentService, PageRequest,
    PanelRequest,
};
use tracing::{debug, info, warn};

pub struct DashScopeContentService {
    client: DashScopeClient,
}

impl DashScopeContentService {
    pub fn new(client: DashScopeClient) -> Self {
        Self { client }
    }

    async fn render(
        &self,
        kind: &'static str,
        api_key: &ApiKey,
        instruction: String,
        references: &[CharacterReference],
        options: ImageOptions,
    ) -> Result<GeneratedImage, ContentError> {
        let optimized = self
            .client
            .chat(api_key, &instruction, false)
            .await
            .map_err(|e| log_failure(kind, e))?;
        debug!(kind, prompt_len = optimized.len(), "Image prompt optimised");

        let prompt = match prompts::reference_preamble(references) {
            Some(preamble) => format!("{preamble} {optimized}"),
            None => optimized.clone(),
        };
        let job = ImageJob {
            prompt,
            images: references.iter().map(|r| r.image_url.clone()).collect(),
            options,
        };

        let url = self
            .client
            .generate_image(api_key, job)
            .await
            .map_err(|e| log_failure(kind, e))?;
        info!(kind, url = %url, "Image generated");

        Ok(GeneratedImage {
            image_url: url,
            revised_prompt: None,
            optimized_prompt: Some(optimized),
        })
    }

    async fn analyze_json(
        &self,
        req: &AnalyzeRequest,
        prompt: String,
    ) -> Result<String, ContentError> {
        if req.text.trim().is_empty() {
            return Err(ContentError::InvalidRequest("story text is empty".into()));
        }
        self.client
            .chat(&req.api_key, &prompt, true)
            .await
            .map_err(|e| log_failure("analysis", e))
    }
}

fn log_failure(kind: &'static str, err: DashScopeError) -> ContentError {
    warn!(kind, error = %err, "DashScope call failed");
    err.into()
}

fn malformed(err: serde_json::Error) -> ContentError {
    ContentError::MalformedResponse(format!("analysis reply is not the expected JSON: {err}"))
}

#[async_trait]
impl ContentService for DashScopeContentService {
    async fn analyze_scenes(&self, req: AnalyzeRequest) -> Result<Vec<Scene>, ContentError> {
        let reply = self
            .analyze_json(&req, prompts::scenes_prompt(req.text.trim()))
            .await?;
        let scenes = parse_scenes(&reply).map_err(malformed)?;
        info!(scenes = scenes.len(), "Story split into scenes");
        Ok(scenes)
    }

    async fn analyze_pages(&self, req: AnalyzeRequest) -> Result<Vec<PageDraft>, ContentError> {
        let reply = self
            .analyze_json(&req, prompts::pages_prompt(req.text.trim()))
            .await?;
        let pages = parse_pages(&reply).map_err(malformed)?;
        info!(pages = pages.len(), "Story split into pages");
        Ok(pages)
    }

    async fn render_panel(&self, req: PanelRequest) -> Result<GeneratedImage, ContentError> {
        if req.scene.description.trim().is_empty() {
            return Err(ContentError::InvalidRequest("scene description is empty".into()));
        }
        let instruction = prompts::panel_prompt(&req.scene, &req.references, req.style);
        self.render("panel", &req.api_key, instruction, &req.references, req.options)
            .await
    }

    async fn render_page(&self, req: PageRequest) -> Result<GeneratedImage, ContentError> {
        if req.scenes.is_empty() {
            return Err(ContentError::InvalidRequest("page has no scenes".into()));
        }
        let instruction = prompts::page_prompt(
            req.page_number,
            &req.title,
            &req.scenes,
            &req.references,
            req.style,
        );
        self.render("page", &req.api_key, instruction, &req.references, req.options)
            .await
    }

    async fn render_character_sheet(
        &self,
        req: CharacterSheetRequest,
    ) -> Result<GeneratedImage, ContentError> {
        if req.name.trim().is_empty() || req.description.trim().is_empty() {
            return Err(ContentError::InvalidRequest(
                "character name and description are required".into(),
            ));
        }
        let instruction = prompts::character_sheet_prompt(
            &req.name,
            &req.description,
            req.style,
            req.reference_image.is_some(),
        );

        // The user-supplied picture goes first, as the character's own reference
        let references: Vec<CharacterReference> = req
            .reference_image
            .iter()
            .map(|url| CharacterReference {
                name: req.name.clone(),
                image_url: url.clone(),
            })
            .collect();
        self.render("sheet", &req.api_key, instruction, &references, req.options)
            .await
    }
}
