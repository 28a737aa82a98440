//! Bounded task queue
//!
//! Runs at most `max_concurrent` payloads at once, admits waiting tasks in
//! FIFO order, and notifies listeners with a [`QueueStatus`] snapshot on every
//! counter change.
//!
//! - Payload failures and panics are counted, logged and cached as
//!   [`TaskOutcome::Failed`]; they never reach the caller of `enqueue`.
//! - Notifications are queued under the state lock in the order the state
//!   changed, then drained by one dispatcher at a time outside the lock, so a
//!   listener may call back into the queue.
//! - `reset()` detaches running tasks: they keep their slot until they settle,
//!   but their settlement no longer touches the counters or the result cache.

mod panic_guard;

pub use panic_guard::{execute_guarded, execute_guarded_async, PanicGuardResult};

use crate::domain::{
    QueueConfig, QueueError, QueueStatus, QueueTask, TaskError, TaskId, TaskOutcome,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Status callback
pub type Listener = Arc<dyn Fn(&QueueStatus) + Send + Sync>;

/// Identity of one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

struct QueueState<T> {
    waiting: VecDeque<QueueTask<T>>,
    running: HashSet<TaskId>,
    /// Tasks that were running when `reset()` was called
    detached: usize,
    completed: usize,
    failed: usize,
    epoch: u64,
    outcomes: HashMap<TaskId, TaskOutcome<T>>,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener: u64,
    notifications: VecDeque<QueueStatus>,
    dispatching: bool,
}

impl<T> QueueState<T> {
    fn new() -> Self {
        Self {
            waiting: VecDeque::new(),
            running: HashSet::new(),
            detached: 0,
            completed: 0,
            failed: 0,
            epoch: 0,
            outcomes: HashMap::new(),
            listeners: BTreeMap::new(),
            next_listener: 0,
            notifications: VecDeque::new(),
            dispatching: false,
        }
    }

    fn status(&self) -> QueueStatus {
        QueueStatus {
            running: self.running.len(),
            waiting: self.waiting.len(),
            completed: self.completed,
            failed: self.failed,
        }
    }

    fn is_pending(&self, id: &str) -> bool {
        self.running.contains(id) || self.waiting.iter().any(|task| task.id() == id)
    }

    fn occupied_slots(&self) -> usize {
        self.running.len() + self.detached
    }
}

struct QueueInner<T> {
    config: QueueConfig,
    runtime: Handle,
    state: Mutex<QueueState<T>>,
    status_tx: watch::Sender<QueueStatus>,
}

impl<T: Send + 'static> QueueInner<T> {
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        // Listeners and payloads never run under this lock, so a poisoned
        // guard still holds consistent counters
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a notification for the current state (caller holds the lock)
    fn record(&self, state: &mut QueueState<T>) {
        let status = state.status();
        state.notifications.push_back(status);
        self.status_tx.send_replace(status);
    }

    /// Deliver queued notifications, unless another caller is already doing it
    fn dispatch(&self) {
        {
            let mut state = self.lock();
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }

        loop {
            let (status, listeners) = {
                let mut state = self.lock();
                match state.notifications.pop_front() {
                    Some(status) => {
                        let listeners: Vec<Listener> = state.listeners.values().cloned().collect();
                        (status, listeners)
                    }
                    None => {
                        state.dispatching = false;
                        return;
                    }
                }
            };

            for listener in listeners {
                let _ = execute_guarded("queue status listener", || listener(&status));
            }
        }
    }

    /// Admit waiting tasks while slots are free
    fn advance(self: &Arc<Self>) {
        let admitted = {
            let mut state = self.lock();
            let mut admitted = Vec::new();
            while state.occupied_slots() < self.config.max_concurrent {
                let Some(task) = state.waiting.pop_front() else {
                    break;
                };
                state.running.insert(task.id().to_string());
                let epoch = state.epoch;
                self.record(&mut state);
                admitted.push((task, epoch));
            }
            admitted
        };

        if admitted.is_empty() {
            return;
        }
        self.dispatch();
        for (task, epoch) in admitted {
            self.launch(task, epoch);
        }
    }

    fn launch(self: &Arc<Self>, task: QueueTask<T>, epoch: u64) {
        let inner = Arc::clone(self);
        let (id, run) = task.into_parts();
        debug!(queue = %self.config.name, task_id = %id, "Task started");

        self.runtime.spawn(async move {
            let outcome = match execute_guarded_async(&id, async move { run().await }).await {
                PanicGuardResult::Success(Ok(value)) => TaskOutcome::Completed(value),
                PanicGuardResult::Success(Err(err)) => {
                    warn!(queue = %inner.config.name, task_id = %id, error = %err, "Task failed");
                    TaskOutcome::Failed(err)
                }
                PanicGuardResult::Panicked(msg) => TaskOutcome::Failed(TaskError::Panicked(msg)),
            };
            inner.settle(id, epoch, outcome);
        });
    }

    fn settle(self: &Arc<Self>, id: TaskId, epoch: u64, outcome: TaskOutcome<T>) {
        let stale = {
            let mut state = self.lock();
            if epoch != state.epoch {
                state.detached = state.detached.saturating_sub(1);
                Some(outcome)
            } else {
                state.running.remove(&id);
                if outcome.is_completed() {
                    state.completed += 1;
                } else {
                    state.failed += 1;
                }
                debug!(queue = %self.config.name, task_id = %id, "Task settled");
                state.outcomes.insert(id.clone(), outcome);
                self.record(&mut state);
                None
            }
        };

        if stale.is_some() {
            debug!(
                queue = %self.config.name,
                task_id = %id,
                "Detached task settled after reset; counters untouched"
            );
        }
        drop(stale);

        self.dispatch();
        self.advance();
    }
}

/// Removal side of a subscription, independent of the task value type
trait ListenerRegistry: Send + Sync {
    fn remove_listener(&self, id: ListenerId) -> bool;
}

impl<T: Send + 'static> ListenerRegistry for QueueInner<T> {
    fn remove_listener(&self, id: ListenerId) -> bool {
        self.lock().listeners.remove(&id).is_some()
    }
}

/// Handle returned by [`TaskQueue::subscribe`]
#[must_use = "keep the subscription to unsubscribe later"]
pub struct Subscription {
    id: ListenerId,
    registry: Weak<dyn ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Permanently remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove_listener(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Bounded concurrent task queue (cheap to clone, clones share state)
pub struct TaskQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> TaskQueue<T> {
    /// Create a queue driven by the current tokio runtime
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        Self::with_handle(config, runtime)
    }

    /// Create a queue that spawns payloads on the given runtime
    pub fn with_handle(config: QueueConfig, runtime: Handle) -> Result<Self, QueueError> {
        config.validate()?;
        let (status_tx, _) = watch::channel(QueueStatus::default());
        info!(
            queue = %config.name,
            max_concurrent = config.max_concurrent,
            "Task queue created"
        );
        Ok(Self {
            inner: Arc::new(QueueInner {
                config,
                runtime,
                state: Mutex::new(QueueState::new()),
                status_tx,
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Append one task and start it if a slot is free
    pub fn enqueue(&self, task: QueueTask<T>) -> Result<(), QueueError> {
        {
            let mut state = self.inner.lock();
            if state.is_pending(task.id()) {
                return Err(QueueError::DuplicateTask(task.id().to_string()));
            }
            debug!(queue = %self.inner.config.name, task_id = %task.id(), "Task enqueued");
            state.waiting.push_back(task);
            self.inner.record(&mut state);
        }
        self.inner.dispatch();
        self.inner.advance();
        Ok(())
    }

    /// Append all tasks in one step, then start as many as slots allow.
    ///
    /// The batch is rejected as a whole if any id is already pending or
    /// appears twice in the batch.
    pub fn enqueue_batch(&self, tasks: Vec<QueueTask<T>>) -> Result<(), QueueError> {
        if tasks.is_empty() {
            return Ok(());
        }
        {
            let mut state = self.inner.lock();
            let mut seen = HashSet::with_capacity(tasks.len());
            for task in &tasks {
                if !seen.insert(task.id()) || state.is_pending(task.id()) {
                    return Err(QueueError::DuplicateTask(task.id().to_string()));
                }
            }
            debug!(queue = %self.inner.config.name, count = tasks.len(), "Batch enqueued");
            state.waiting.extend(tasks);
            self.inner.record(&mut state);
        }
        self.inner.dispatch();
        self.inner.advance();
        Ok(())
    }

    /// Register a status listener, called synchronously on every change
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&QueueStatus) + Send + Sync + 'static,
    {
        let id = {
            let mut state = self.inner.lock();
            let id = ListenerId(state.next_listener);
            state.next_listener += 1;
            state.listeners.insert(id, Arc::new(listener));
            id
        };
        let registry: Weak<dyn ListenerRegistry> = Arc::downgrade(&self.inner) as Weak<_>;
        Subscription { id, registry }
    }

    /// Receiver that always holds the latest status
    pub fn watch(&self) -> watch::Receiver<QueueStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn status(&self) -> QueueStatus {
        self.inner.lock().status()
    }

    /// Drop waiting tasks, zero the counters and forget cached outcomes.
    ///
    /// Running tasks are detached, not cancelled. Returns how many waiting
    /// tasks were discarded.
    pub fn reset(&self) -> usize {
        let (discarded, outcomes, detached) = {
            let mut state = self.inner.lock();
            let discarded = std::mem::take(&mut state.waiting);
            let outcomes = std::mem::take(&mut state.outcomes);
            let detached = state.running.len();
            state.detached += detached;
            state.running.clear();
            state.completed = 0;
            state.failed = 0;
            state.epoch += 1;
            self.inner.record(&mut state);
            (discarded, outcomes, detached)
        };

        info!(
            queue = %self.inner.config.name,
            discarded = discarded.len(),
            detached,
            "Queue reset"
        );
        // Payload closures and results are dropped outside the lock
        let count = discarded.len();
        drop(discarded);
        drop(outcomes);

        self.inner.dispatch();
        count
    }

    /// Resolve once nothing is waiting and nothing is running
    pub async fn wait_all(&self) {
        let mut rx = self.inner.status_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(QueueStatus::is_idle).await;
    }
}

impl<T: Clone + Send + 'static> TaskQueue<T> {
    /// Cached outcome of a task settled since the last reset
    pub fn outcome(&self, id: &str) -> Option<TaskOutcome<T>> {
        self.inner.lock().outcomes.get(id).cloned()
    }

    /// Value of a task that completed since the last reset
    pub fn result(&self, id: &str) -> Option<T> {
        self.inner
            .lock()
            .outcomes
            .get(id)
            .and_then(|outcome| outcome.value().cloned())
    }
}

impl<T: Send + 'static> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.inner.config.name)
            .field("max_concurrent", &self.inner.config.max_concurrent)
            .field("status", &self.status())
            .finish()
    }
}
