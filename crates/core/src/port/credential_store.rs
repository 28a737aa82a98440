// Credential Store Port
// One API key persisted under one named key; absence is a valid state

use crate::error::{AppError, Result};
use async_trait::async_trait;

/// Remote service credential. Debug output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trims surrounding whitespace; an empty key is a validation error
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("API key must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short hint for display ("sk-a…9f")
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 2..].iter().collect();
        format!("{head}…{tail}")
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored key, or `None` when nothing is configured
    async fn get(&self) -> Result<Option<ApiKey>>;

    async fn set(&self, key: &ApiKey) -> Result<()>;

    /// Remove the stored key (no-op when absent)
    async fn clear(&self) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory credential store
    #[derive(Default, Clone)]
    pub struct InMemoryCredentialStore {
        key: Arc<Mutex<Option<ApiKey>>>,
    }

    impl InMemoryCredentialStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_key(raw: &str) -> Self {
            let store = Self::new();
            *store.key.lock().unwrap() = Some(ApiKey(raw.trim().to_string()));
            store
        }
    }

    #[async_trait]
    impl CredentialStore for InMemoryCredentialStore {
        async fn get(&self) -> Result<Option<ApiKey>> {
            Ok(self.key.lock().unwrap().clone())
        }

        async fn set(&self, key: &ApiKey) -> Result<()> {
            *self.key.lock().unwrap() = Some(key.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            *self.key.lock().unwrap() = None;
            Ok(())
        }
    }
}
