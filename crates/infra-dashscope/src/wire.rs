//! DashScope request and response bodies.
//!
//! Two endpoints are used: the OpenAI-compatible chat completions API for
//! text, and the multimodal generation API for images. The image endpoint
//! has answered in two shapes over time, both are accepted.

use panelcraft_core::domain::{PageDraft, Scene};
use serde::{Deserialize, Serialize};

// ---- chat completions ----

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatReply,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if any and non-blank
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

// ---- multimodal image generation ----

#[derive(Debug, Serialize)]
pub struct ImageRequest<'a> {
    pub model: &'a str,
    pub input: ImageInput,
    pub parameters: ImageParameters<'a>,
}

#[derive(Debug, Serialize)]
pub struct ImageInput {
    pub messages: Vec<ImageMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageMessage {
    #[serde(default)]
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// One multimodal content entry: either an image URL or a text prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentPart {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            image: Some(url.into()),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            image: None,
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageParameters<'a> {
    pub size: &'a str,
    pub negative_prompt: &'a str,
    pub watermark: bool,
    pub n: u32,
}

#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub output: Option<ImageOutput>,
}

#[derive(Debug, Deserialize)]
pub struct ImageOutput {
    /// Older shape: `output.results[0].url`
    #[serde(default)]
    pub results: Vec<ImageResult>,
    /// Newer shape: `output.choices[0].message.content[0].image`
    #[serde(default)]
    pub choices: Vec<ImageChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ImageResult {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageChoice {
    pub message: ImageMessage,
}

impl ImageResponse {
    pub fn image_url(&self) -> Option<&str> {
        let output = self.output.as_ref()?;
        if let Some(url) = output.results.first().and_then(|r| r.url.as_deref()) {
            return Some(url);
        }
        output
            .choices
            .first()
            .and_then(|choice| choice.message.content.first())
            .and_then(|part| part.image.as_deref())
    }
}

// ---- errors ----

/// Error body of either API family
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<NestedError>,
}

#[derive(Debug, Deserialize)]
struct NestedError {
    #[serde(default)]
    message: Option<String>,
}

/// Provider message from a non-2xx body, if it has one
pub fn provider_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or_else(|| parsed.error.and_then(|e| e.message))
        .filter(|message| !message.trim().is_empty())
}

// ---- analysis payloads ----

#[derive(Debug, Deserialize)]
struct ScenesEnvelope {
    scenes: Vec<Scene>,
}

#[derive(Debug, Deserialize)]
struct PagesEnvelope {
    pages: Vec<PageDraft>,
}

/// Drop a surrounding markdown code fence, if the model added one
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_scenes(text: &str) -> Result<Vec<Scene>, serde_json::Error> {
    serde_json::from_str::<ScenesEnvelope>(strip_code_fence(text)).map(|env| env.scenes)
}

pub fn parse_pages(text: &str) -> Result<Vec<PageDraft>, serde_json::Error> {
    serde_json::from_str::<PagesEnvelope>(strip_code_fence(text)).map(|env| env.pages)
}
