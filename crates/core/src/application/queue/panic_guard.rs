// Panic isolation for queue payloads and status listeners
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Result of a panic-guarded execution
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Execution completed successfully
    Success(T),
    /// Execution panicked
    Panicked(String),
}

/// Execute a closure with panic isolation
///
/// A panicking closure is reported as `PanicGuardResult::Panicked` instead of
/// unwinding into the caller. Used for status listeners, so one broken
/// listener cannot stop the others from being notified.
pub fn execute_guarded<F, T>(label: &str, f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info);
            error!(target_label = %label, panic_msg = %panic_msg, "Guarded call panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

/// Await a future with panic isolation
///
/// Panics raised while polling (including while building the future inside
/// an `async` block) are caught and reported as `Panicked`.
pub async fn execute_guarded_async<F, T>(label: &str, future: F) -> PanicGuardResult<T>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => PanicGuardResult::Success(result),
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info);
            error!(target_label = %label, panic_msg = %panic_msg, "Guarded task panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

fn panic_message(panic_info: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_panic_is_caught() {
        let result: PanicGuardResult<()> = execute_guarded("listener", || panic!("boom"));
        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "boom"),
            other => panic!("expected panic, got {other:?}"),
        }
        assert!(matches!(
            execute_guarded("listener", || 5),
            PanicGuardResult::Success(5)
        ));
    }

    #[tokio::test]
    async fn test_async_panic_is_caught() {
        let result: PanicGuardResult<u8> = execute_guarded_async("task", async {
            tokio::task::yield_now().await;
            panic!("{}", String::from("late boom"))
        })
        .await;
        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "late boom"),
            other => panic!("expected panic, got {other:?}"),
        }
    }
}
