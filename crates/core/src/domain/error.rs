// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Item is already generating: {0}")]
    ItemBusy(String),

    #[error("Item index out of range: {index} (storyboard has {len} items)")]
    ItemOutOfRange { index: usize, len: usize },

    #[error("Storyboard mode mismatch: expected {expected}, found {found}")]
    ModeMismatch { expected: String, found: String },

    #[error("Unknown comic style: {0}")]
    UnknownStyle(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
