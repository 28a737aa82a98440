// Application Layer - Use Cases and Business Logic

pub mod orchestrator;
pub mod queue;
pub mod roster;

// Re-exports
pub use orchestrator::{resolve_references, AnalysisSummary, BatchReport, GenerationOrchestrator};
pub use queue::{ListenerId, Subscription, TaskQueue};
pub use roster::RosterService;
