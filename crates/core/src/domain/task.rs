// Task Domain Model

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use thiserror::Error;

/// Caller-assigned task identifier (e.g. "panel-3")
pub type TaskId = String;

/// Boxed payload future
pub type TaskFuture<T> = BoxFuture<'static, Result<T, TaskError>>;

type TaskFn<T> = Box<dyn FnOnce() -> TaskFuture<T> + Send>;

/// Why a task payload did not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The remote call failed; the owning item already recorded the message
    #[error("Remote failure: {0}")]
    Remote(String),

    /// The item was already being generated by another task
    #[error("Item busy: {0}")]
    Busy(String),

    /// The storyboard was replaced while the task was in flight
    #[error("Stale task: {0}")]
    Stale(String),

    /// The payload panicked (caught by the queue driver)
    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Task failed: {0}")]
    Failed(String),
}

/// Settled result of a task, cached by id until the next reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Completed(T),
    Failed(TaskError),
}

impl<T> TaskOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            TaskOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        match self {
            TaskOutcome::Completed(_) => None,
            TaskOutcome::Failed(err) => Some(err),
        }
    }
}

/// One schedulable unit of work: an id plus a zero-argument async payload.
///
/// The queue never inspects the payload; it only runs it once and records
/// whether it resolved or failed.
pub struct QueueTask<T> {
    id: TaskId,
    run: TaskFn<T>,
}

impl<T: Send + 'static> QueueTask<T> {
    pub fn new<F, Fut>(id: impl Into<TaskId>, payload: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            run: Box::new(move || payload().boxed()),
        }
    }

    /// Split into id and payload (consumed by the queue driver)
    pub(crate) fn into_parts(self) -> (TaskId, TaskFn<T>) {
        (self.id, self.run)
    }
}

impl<T> QueueTask<T> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> std::fmt::Debug for QueueTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueTask").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_task_payload_runs_once_when_invoked() {
        let task = QueueTask::new("t-1", || async { Ok::<_, TaskError>(7) });
        assert_eq!(task.id(), "t-1");

        let (id, run) = task.into_parts();
        assert_eq!(id, "t-1");
        assert_eq!(run().await, Ok(7));
    }

    // Callers without a Send bound on T (queue bookkeeping) can read ids
    fn ids<T>(tasks: &[QueueTask<T>]) -> Vec<&str> {
        tasks.iter().map(QueueTask::id).collect()
    }

    #[test]
    fn test_id_readable_without_send_bound() {
        let tasks = vec![
            QueueTask::new("panel-0", || async { Ok::<_, TaskError>(()) }),
            QueueTask::new("panel-1", || async { Ok::<_, TaskError>(()) }),
        ];
        assert_eq!(ids(&tasks), vec!["panel-0", "panel-1"]);
    }

    #[test]
    fn test_outcome_accessors() {
        let ok: TaskOutcome<u8> = TaskOutcome::Completed(1);
        let failed: TaskOutcome<u8> = TaskOutcome::Failed(TaskError::Remote("503".into()));

        assert!(ok.is_completed());
        assert_eq!(ok.value(), Some(&1));
        assert!(ok.error().is_none());

        assert!(!failed.is_completed());
        assert!(failed.value().is_none());
        assert_eq!(failed.error(), Some(&TaskError::Remote("503".into())));
    }
}
