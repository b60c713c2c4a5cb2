//! Disposal scopes.
//!
//! A [`Scope`] stands in for the lifetime of a piece of UI: reactive work
//! created inside it registers cleanup callbacks, and disposing the scope
//! runs them exactly once, in reverse registration order. Dropping the last
//! handle disposes implicitly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Cleanup = Box<dyn FnOnce() + Send>;

struct ScopeInner {
    disposed: AtomicBool,
    // `None` once disposed; callbacks registered afterwards run immediately.
    cleanups: Mutex<Option<Vec<Cleanup>>>,
}

/// An ownership scope for reactive work.
///
/// Cloning a `Scope` clones the handle; all handles dispose the same set of
/// cleanups. Disposal is idempotent: callbacks run exactly once no matter
/// how many times [`Scope::dispose`] is called or from which thread.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// Create a new, live scope.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                disposed: AtomicBool::new(false),
                cleanups: Mutex::new(Some(Vec::new())),
            }),
        }
    }

    /// Register a callback to run when the scope is disposed.
    ///
    /// Callbacks run in reverse registration order. If the scope has
    /// already been disposed the callback runs immediately.
    pub fn on_cleanup<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let run_now = {
            let mut guard = self.inner.cleanups.lock();
            match guard.as_mut() {
                Some(cleanups) => {
                    cleanups.push(Box::new(f));
                    None
                }
                None => Some(f),
            }
        };
        if let Some(f) = run_now {
            f();
        }
    }

    /// Dispose the scope, running all registered cleanups.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn dispose(&self) {
        let cleanups = {
            let mut guard = self.inner.cleanups.lock();
            self.inner.disposed.store(true, Ordering::Release);
            guard.take()
        };
        if let Some(cleanups) = cleanups {
            tracing::trace!(
                target: "meridian_reactive::scope",
                cleanup_count = cleanups.len(),
                "disposing scope"
            );
            for cleanup in cleanups.into_iter().rev() {
                cleanup();
            }
        }
    }

    /// Check whether the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if let Some(cleanups) = self.cleanups.lock().take() {
            for cleanup in cleanups.into_iter().rev() {
                cleanup();
            }
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
