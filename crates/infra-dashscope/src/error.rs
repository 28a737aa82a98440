// DashScope adapter errors

use crate::wire::provider_message;
use panelcraft_core::port::ContentError;

/// Errors from the DashScope HTTP layer
#[derive(Debug, thiserror::Error)]
pub enum DashScopeError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// DashScope returned a non-2xx status code
    #[error("DashScope API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// 2xx response that did not contain what we asked for
    #[error("Unexpected DashScope response: {0}")]
    Decode(String),
}

impl From<DashScopeError> for ContentError {
    fn from(err: DashScopeError) -> Self {
        match err {
            DashScopeError::Request(e) if e.is_decode() => {
                ContentError::MalformedResponse(e.to_string())
            }
            DashScopeError::Request(e) => ContentError::Transport(e.to_string()),
            DashScopeError::ApiError { status, body } => {
                let message = provider_message(&body).unwrap_or(body);
                match status {
                    401 | 403 => ContentError::Unauthorized(message),
                    _ => ContentError::Rejected { status, message },
                }
            }
            DashScopeError::Decode(message) => ContentError::MalformedResponse(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let unauthorized: ContentError = DashScopeError::ApiError {
            status: 401,
            body: r#"{"code":"InvalidApiKey","message":"Invalid API-key provided."}"#.into(),
        }
        .into();
        assert_eq!(
            unauthorized,
            ContentError::Unauthorized("Invalid API-key provided.".into())
        );

        let throttled: ContentError = DashScopeError::ApiError {
            status: 429,
            body: "Too Many Requests".into(),
        }
        .into();
        assert_eq!(
            throttled,
            ContentError::Rejected {
                status: 429,
                message: "Too Many Requests".into()
            }
        );

        let decode: ContentError = DashScopeError::Decode("no image".into()).into();
        assert!(matches!(decode, ContentError::MalformedResponse(_)));
    }
}
