// Port Layer - Interfaces for external dependencies

pub mod content_service;
pub mod credential_store;
pub mod id_provider; // For deterministic testing
pub mod roster_store;
pub mod time_provider;

// Re-exports
pub use content_service::{
    AnalyzeRequest, CharacterSheetRequest, ContentError, ContentService, PageRequest,
    PanelRequest,
};
pub use credential_store::{ApiKey, CredentialStore};
pub use id_provider::IdProvider;
pub use roster_store::RosterStore;
pub use time_provider::TimeProvider;
