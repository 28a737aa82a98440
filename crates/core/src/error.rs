// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Remote service error: {0}")]
    Remote(#[from] crate::port::ContentError),

    #[error("Queue error: {0}")]
    Queue(#[from] crate::domain::QueueError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Pre-flight errors are raised before any task is submitted
    pub fn is_preflight(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::Validation(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error and reqwest::Error conversions live in the adapter
// crates, which map them to AppError::Database / ContentError
