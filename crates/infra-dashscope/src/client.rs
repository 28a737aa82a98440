//! REST client for the DashScope endpoints.
//!
//! Wraps chat completions (text) and multimodal generation (images) using
//! [`reqwest`]. Every call takes the API key explicitly; the client holds no
//! credential of its own.

use crate::error::DashScopeError;
use crate::wire::{
    ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageInput, ImageMessage,
    ImageParameters, ImageRequest, ImageResponse, ResponseFormat,
};
use panelcraft_core::domain::ImageOptions;
use panelcraft_core::port::ApiKey;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const CHAT_PATH: &str = "/compatible-mode/v1/chat/completions";
const IMAGE_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";

/// Client settings
#[derive(Debug, Clone)]
pub struct DashScopeConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Chat model for analysis and prompt optimisation
    pub text_model: String,
    /// Image model used when reference images are attached
    pub edit_model: String,
    /// Image model used for prompt-only generation
    pub image_model: String,
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            text_model: "qwen-plus".to_string(),
            edit_model: "qwen-image-edit".to_string(),
            image_model: "qwen-image-plus".to_string(),
        }
    }
}

/// One image generation call
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub prompt: String,
    /// Reference image URLs, sent before the prompt in this order
    pub images: Vec<String>,
    pub options: ImageOptions,
}

/// HTTP client for DashScope
pub struct DashScopeClient {
    client: reqwest::Client,
    config: DashScopeConfig,
}

impl DashScopeClient {
    pub fn new(config: DashScopeConfig) -> Result<Self, DashScopeError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing [`reqwest::Client`]
    pub fn with_client(client: reqwest::Client, mut config: DashScopeConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { client, config }
    }

    pub fn config(&self) -> &DashScopeConfig {
        &self.config
    }

    /// Single-turn chat completion. `json` asks for a JSON object reply.
    pub async fn chat(
        &self,
        api_key: &ApiKey,
        prompt: &str,
        json: bool,
    ) -> Result<String, DashScopeError> {
        let body = ChatRequest {
            model: &self.config.text_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: json.then(ResponseFormat::json_object),
        };
        debug!(model = %self.config.text_model, json, "Chat completion request");

        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, CHAT_PATH))
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponse = Self::parse_response(response).await?;
        parsed
            .text()
            .map(str::to_string)
            .ok_or_else(|| DashScopeError::Decode("chat completion returned no text".into()))
    }

    /// Generate one image and return its URL
    pub async fn generate_image(
        &self,
        api_key: &ApiKey,
        job: ImageJob,
    ) -> Result<String, DashScopeError> {
        let model = if job.images.is_empty() {
            &self.config.image_model
        } else {
            &self.config.edit_model
        };

        let mut content: Vec<ContentPart> =
            job.images.into_iter().map(ContentPart::image).collect();
        let references = content.len();
        content.push(ContentPart::text(job.prompt));

        let body = ImageRequest {
            model,
            input: ImageInput {
                messages: vec![ImageMessage {
                    role: "user".to_string(),
                    content,
                }],
            },
            parameters: ImageParameters {
                size: &job.options.size,
                negative_prompt: " ",
                watermark: false,
                n: 1,
            },
        };
        debug!(model = %model, references, size = %job.options.size, "Image generation request");

        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, IMAGE_PATH))
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await?;

        let parsed: ImageResponse = Self::parse_response(response).await?;
        parsed
            .image_url()
            .map(str::to_string)
            .ok_or_else(|| DashScopeError::Decode("image generation returned no image".into()))
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`DashScopeError::ApiError`] carrying status and body text
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DashScopeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DashScopeError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DashScopeError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! One-shot HTTP server returning canned responses

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Serve `responses` in order (one per connection) and report each
    /// request's raw text. Returns the base URL.
    pub async fn serve(
        responses: Vec<(u16, String)>,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                let _ = tx.send(request);

                let reply = format!(
                    "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        (format!("http://{addr}"), rx)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: String) -> DashScopeClient {
        DashScopeClient::new(DashScopeConfig {
            base_url,
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    fn key() -> ApiKey {
        ApiKey::parse("sk-test-0001").unwrap()
    }

    #[tokio::test]
    async fn test_chat_sends_bearer_and_json_mode() {
        let reply = json!({ "choices": [ { "message": { "content": "{\"scenes\":[]}" } } ] });
        let (base, mut requests) = test_server::serve(vec![(200, reply.to_string())]).await;

        let text = client(base).chat(&key(), "split this", true).await.unwrap();
        assert_eq!(text, "{\"scenes\":[]}");

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("POST /compatible-mode/v1/chat/completions"));
        assert!(request.contains("authorization: Bearer sk-test-0001"));
        assert!(request.contains("\"json_object\""));
        assert!(request.contains("\"qwen-plus\""));
    }

    #[tokio::test]
    async fn test_image_model_follows_references() {
        let ok = json!({ "output": { "results": [ { "url": "https://oss/x.png" } ] } }).to_string();
        let (base, mut requests) =
            test_server::serve(vec![(200, ok.clone()), (200, ok)]).await;
        let client = client(format!("{base}/"));

        let url = client
            .generate_image(
                &key(),
                ImageJob {
                    prompt: "a lighthouse".into(),
                    images: vec![],
                    options: ImageOptions::standard(),
                },
            )
            .await
            .unwrap();
        assert_eq!(url, "https://oss/x.png");
        let plain = requests.recv().await.unwrap();
        assert!(plain.starts_with("POST /api/v1/services/aigc/multimodal-generation/generation"));
        assert!(plain.contains("\"qwen-image-plus\""));

        client
            .generate_image(
                &key(),
                ImageJob {
                    prompt: "Mei at the lighthouse".into(),
                    images: vec!["https://img/mei.png".into()],
                    options: ImageOptions::hd(),
                },
            )
            .await
            .unwrap();
        let edit = requests.recv().await.unwrap();
        assert!(edit.contains("\"qwen-image-edit\""));
        assert!(edit.contains("{\"image\":\"https://img/mei.png\"}"));
        assert!(edit.contains("\"watermark\":false"));
    }

    #[tokio::test]
    async fn test_error_status_and_missing_image() {
        let (base, _requests) = test_server::serve(vec![
            (401, json!({ "message": "Invalid API-key provided." }).to_string()),
            (200, json!({ "output": {} }).to_string()),
        ])
        .await;
        let client = client(base);
        let job = ImageJob {
            prompt: "x".into(),
            images: vec![],
            options: ImageOptions::standard(),
        };

        let err = client.generate_image(&key(), job.clone()).await.unwrap_err();
        assert!(matches!(err, DashScopeError::ApiError { status: 401, .. }));

        let err = client.generate_image(&key(), job).await.unwrap_err();
        assert!(matches!(err, DashScopeError::Decode(_)));
    }
}
