// Domain Layer - Pure business logic and entities

pub mod character;
pub mod error;
pub mod queue;
pub mod scene;
pub mod storyboard;
pub mod style;
pub mod task;

// Re-exports
pub use character::{Character, CharacterId, CharacterReference, CharacterUpdate, NewCharacter};
pub use error::DomainError;
pub use queue::{QueueConfig, QueueError, QueueId, QueueStatus, DEFAULT_MAX_CONCURRENT};
pub use scene::{PageDraft, Scene};
pub use storyboard::{
    ItemPhase, ItemState, ItemWork, Page, Panel, Storyboard, StoryboardContent,
};
pub use style::{ComicStyle, GeneratedImage, ImageOptions, ImageQuality, LayoutMode};
pub use task::{QueueTask, TaskError, TaskFuture, TaskId, TaskOutcome};
