// Queue Domain Model

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queue identifier (used in logs only)
pub type QueueId = String;

/// Default number of generation requests allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: QueueId,
    pub max_concurrent: usize,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, max_concurrent: usize) -> Self {
        Self {
            name: name.into(),
            max_concurrent,
        }
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.max_concurrent == 0 {
            return Err(QueueError::InvalidConfig(format!(
                "max_concurrent must be at least 1 (queue '{}')",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new("generation", DEFAULT_MAX_CONCURRENT)
    }
}

/// Immutable snapshot of the queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub running: usize,
    pub waiting: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueStatus {
    /// Nothing waiting and nothing running
    pub fn is_idle(&self) -> bool {
        self.running == 0 && self.waiting == 0
    }

    /// Tasks settled since the last reset
    pub fn settled(&self) -> usize {
        self.completed + self.failed
    }

    /// Tasks submitted since the last reset that have not settled yet
    pub fn unresolved(&self) -> usize {
        self.running + self.waiting
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "running={} waiting={} completed={} failed={}",
            self.running, self.waiting, self.completed, self.failed
        )
    }
}

/// Errors raised by the queue itself (never by task payloads)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("Task id already pending: {0}")]
    DuplicateTask(String),

    #[error("No tokio runtime available to drive the queue")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = QueueConfig::new("q", 0);
        assert!(matches!(
            config.validate(),
            Err(QueueError::InvalidConfig(_))
        ));
        assert!(QueueConfig::default().validate().is_ok());
    }

    #[test]
    fn test_status_helpers() {
        let status = QueueStatus {
            running: 2,
            waiting: 1,
            completed: 4,
            failed: 1,
        };
        assert!(!status.is_idle());
        assert_eq!(status.unresolved(), 3);
        assert_eq!(status.settled(), 5);
        assert!(QueueStatus::default().is_idle());
        assert_eq!(
            status.to_string(),
            "running=2 waiting=1 completed=4 failed=1"
        );
    }
}
