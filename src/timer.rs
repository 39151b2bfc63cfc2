//! Background timers for handler-owned periodic work.
//!
//! Timers are never cancelled by the dispatcher. A handler that starts one
//! for a connection must call [`Timer::cancel`] when the connection ends.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a spawned timer task.
#[derive(Debug)]
pub struct Timer {
    handle: JoinHandle<()>,
}

impl Timer {
    /// Stop the timer. Work already running is aborted at its next await.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task has finished, either by running out or by cancellation.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run `task` every `period`, starting one period from now.
///
/// Must be called from within a tokio runtime.
pub fn set_interval<F, Fut>(period: Duration, mut task: F) -> Timer
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            task().await;
        }
    });
    Timer { handle }
}

/// Run `task` once after `delay`.
///
/// Must be called from within a tokio runtime.
pub fn set_timeout<F, Fut>(delay: Duration, task: F) -> Timer
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        task().await;
    });
    Timer { handle }
}
