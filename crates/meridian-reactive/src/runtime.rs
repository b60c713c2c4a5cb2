//! Global async runtime for reactive work.
//!
//! Reactive constructors run on whatever thread creates the UI; they cannot
//! assume an ambient Tokio context. The crate therefore owns a lazily
//! initialized multi-threaded runtime that resources and bindings spawn
//! their fetch and drain tasks on.
//!
//! # Example
//!
//! ```
//! use meridian_reactive::Runtime;
//!
//! let handle = Runtime::global().spawn(async { 2 + 2 });
//! assert_eq!(handle.blocking_wait(), Some(4));
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

static GLOBAL_RUNTIME: OnceLock<Runtime> = OnceLock::new();

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A handle to a spawned task.
///
/// Provides an awaitable completion and, for cancellable tasks, access to
/// the cancellation token.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: u64,
    receiver: oneshot::Receiver<T>,
    cancellation: Option<CancellationToken>,
}

impl<T> TaskHandle<T> {
    /// Get the unique task id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cooperative cancellation, if the task carries a token.
    pub fn cancel(&self) {
        if let Some(ref token) = self.cancellation {
            token.cancel();
        }
    }

    /// Await the task result.
    ///
    /// Returns `None` if the task was cancelled or dropped its result.
    pub async fn wait(self) -> Option<T> {
        self.receiver.await.ok()
    }

    /// Wait for the result, blocking the current thread.
    ///
    /// Do not call this from async code; it will block the executor.
    pub fn blocking_wait(self) -> Option<T> {
        self.receiver.blocking_recv().ok()
    }
}

/// A cooperative cancellation token.
///
/// `cancel` is idempotent and safe to call after the task has already
/// finished. Tasks observe cancellation by polling
/// [`CancellationToken::is_cancelled`] or awaiting
/// [`CancellationToken::cancelled`].
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<CancelState>,
}

#[derive(Debug)]
struct CancelState {
    cancelled: AtomicBool,
    notify: tokio::sync::Notify,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                notify: tokio::sync::Notify::new(),
            }),
        }
    }

    /// Check whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation and wake any waiters.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::Release) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Wait until cancellation is requested.
    ///
    /// Returns immediately if already cancelled.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register with the waiter list before re-checking the flag;
            // `notify_waiters` only wakes already-registered waiters, so a
            // cancel landing in between would otherwise be missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The async runtime reactive work runs on.
pub struct Runtime {
    // Kept alive so the worker threads are not shut down.
    #[allow(dead_code)]
    runtime: tokio::runtime::Runtime,
    handle: Handle,
}

impl Runtime {
    /// Get the global runtime, initializing it on first use.
    pub fn global() -> &'static Runtime {
        GLOBAL_RUNTIME.get_or_init(|| {
            Runtime::new().expect("failed to create global reactive runtime")
        })
    }

    fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .thread_name("meridian-reactive")
            .enable_time()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self { runtime, handle })
    }

    /// Get a handle for spawning tasks directly.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn a future on the runtime.
    pub fn spawn<F, T>(&self, future: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        self.handle.spawn(async move {
            let result = future.await;
            let _ = sender.send(result);
        });

        TaskHandle {
            id,
            receiver,
            cancellation: None,
        }
    }

    /// Spawn a future that receives a cancellation token.
    ///
    /// The task should check `token.is_cancelled()` periodically or await
    /// `token.cancelled()` to stop early.
    pub fn spawn_cancellable<F, Fut, T>(&self, f: F) -> (TaskHandle<T>, CancellationToken)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let token_for_task = token.clone();

        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        self.handle.spawn(async move {
            let result = f(token_for_task).await;
            let _ = sender.send(result);
        });

        let handle = TaskHandle {
            id,
            receiver,
            cancellation: Some(token.clone()),
        };

        (handle, token)
    }

    /// Block on a future, running it to completion.
    ///
    /// Do not call this from within the runtime's own worker threads.
    pub fn block_on<F, T>(&self, future: F) -> T
    where
        F: Future<Output = T>,
    {
        self.handle.block_on(future)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_spawn_and_wait() {
        let handle = Runtime::global().spawn(async { 42 });
        assert_eq!(handle.blocking_wait(), Some(42));
    }

    #[test]
    fn test_spawn_async_work() {
        let handle = Runtime::global().spawn(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            "done"
        });
        assert_eq!(handle.blocking_wait(), Some("done"));
    }

    #[test]
    fn test_cancellation_token_states() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());

        // Idempotent.
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancellable_task_stops() {
        let (handle, token) = Runtime::global().spawn_cancellable(|token| async move {
            loop {
                if token.is_cancelled() {
                    return "cancelled";
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });

        token.cancel();
        assert_eq!(handle.blocking_wait(), Some("cancelled"));
    }

    #[test]
    fn test_cancelled_wait_returns_immediately_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        Runtime::global().block_on(token.cancelled());
    }

    #[test]
    fn test_cancel_wakes_a_waiting_task() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = Runtime::global().spawn(async move {
            waiter.cancelled().await;
            "woke"
        });

        // Let the waiter reach its await before the cancel lands.
        std::thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert_eq!(handle.blocking_wait(), Some("woke"));
    }

    #[test]
    fn test_handle_cancel_without_token_is_noop() {
        let handle = Runtime::global().spawn(async { 1 });
        handle.cancel();
        assert_eq!(handle.blocking_wait(), Some(1));
    }
}
