//! Resources: asynchronous fetches as reactive state.
//!
//! A [`Resource`] pairs a fetch function with a snapshot of
//! loading/value/error state, re-running the fetch whenever its variables
//! source changes. The snapshot lives in a single-slot
//! [`tokio::sync::watch`] channel so observers always see the latest commit
//! and can await changes.
//!
//! # Key behaviors
//!
//! - `loading` flips to `true` synchronously when a fetch is issued and
//!   back to `false` when its result commits.
//! - A newer fetch supersedes an older in-flight one: stale completions are
//!   discarded via a generation counter, so state only ever reflects the
//!   latest variables.
//! - While a re-fetch is in flight the previous value stays readable.
//! - A successful commit clears the error; a failed commit clears the value.
//! - Disposing the owning [`Scope`] cancels the in-flight fetch and detaches
//!   from the variables source.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use crate::runtime::{CancellationToken, Runtime};
use crate::scope::Scope;
use crate::signal::Signal;

/// The variables input of a [`Resource`]: either a fixed value or a
/// [`Signal`] whose changes re-trigger the fetch.
pub enum Source<V> {
    /// A fixed value; the fetch runs once and never re-triggers.
    Constant(V),
    /// A reactive value; every deduplicated change re-triggers the fetch.
    Signal(Signal<V>),
}

impl<V: Clone> Source<V> {
    /// Create a constant source.
    pub fn constant(value: V) -> Self {
        Self::Constant(value)
    }

    /// Get the current value of the source.
    pub fn get(&self) -> V {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Signal(signal) => signal.get(),
        }
    }
}

impl<V> From<Signal<V>> for Source<V> {
    fn from(signal: Signal<V>) -> Self {
        Self::Signal(signal)
    }
}

impl From<()> for Source<()> {
    fn from(_: ()) -> Self {
        Self::Constant(())
    }
}

/// A snapshot of a resource's state.
#[derive(Debug)]
pub struct ResourceState<T, E> {
    /// Whether a fetch for the latest variables is currently in flight.
    pub loading: bool,
    /// The most recently committed value, if any.
    pub value: Option<T>,
    /// The most recently committed error, if any.
    pub error: Option<E>,
}

impl<T: Clone, E: Clone> Clone for ResourceState<T, E> {
    fn clone(&self) -> Self {
        Self {
            loading: self.loading,
            value: self.value.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T, E> Default for ResourceState<T, E> {
    fn default() -> Self {
        Self {
            loading: false,
            value: None,
            error: None,
        }
    }
}

type Fetcher<V, T, E> = Box<dyn Fn(V) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

struct ResourceInner<V, T, E> {
    state: watch::Sender<ResourceState<T, E>>,
    fetcher: Fetcher<V, T, E>,
    /// Bumped per issued fetch; a completion commits only when its
    /// generation is still current.
    generation: AtomicU64,
    last_vars: Mutex<V>,
    inflight: Mutex<Option<CancellationToken>>,
    /// Serializes the generation check against the state write.
    commit: Mutex<()>,
    disposed: AtomicBool,
}

/// An asynchronous fetch exposed as reactive loading/value/error state.
pub struct Resource<V, T, E> {
    inner: Arc<ResourceInner<V, T, E>>,
}

impl<V, T, E> Clone for Resource<V, T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V, T, E> Resource<V, T, E>
where
    V: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a resource and issue its first fetch.
    ///
    /// The fetch for the source's current value is issued before this
    /// returns, so [`Resource::loading`] reads `true` immediately. When the
    /// source is a signal, every subsequent change re-fetches; the
    /// subscription is removed when `scope` is disposed.
    pub fn new<S, F>(scope: &Scope, source: S, fetcher: F) -> Self
    where
        S: Into<Source<V>>,
        F: Fn(V) -> BoxFuture<'static, Result<T, E>> + Send + Sync + 'static,
    {
        let source = source.into();
        let initial_vars = source.get();
        let (state, _) = watch::channel(ResourceState::default());

        let inner = Arc::new(ResourceInner {
            state,
            fetcher: Box::new(fetcher),
            generation: AtomicU64::new(0),
            last_vars: Mutex::new(initial_vars.clone()),
            inflight: Mutex::new(None),
            commit: Mutex::new(()),
            disposed: AtomicBool::new(false),
        });

        let _ = load(&inner, initial_vars);

        match source {
            Source::Signal(signal) => {
                let subscriber_inner = inner.clone();
                let id = signal.subscribe(move |vars| {
                    let _ = load(&subscriber_inner, vars.clone());
                });
                let cleanup_inner = inner.clone();
                scope.on_cleanup(move || {
                    signal.unsubscribe(id);
                    dispose(&cleanup_inner);
                });
            }
            Source::Constant(_) => {
                let cleanup_inner = inner.clone();
                scope.on_cleanup(move || dispose(&cleanup_inner));
            }
        }

        Self { inner }
    }

    /// Whether a fetch for the latest variables is in flight.
    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// The most recently committed value.
    pub fn value(&self) -> Option<T> {
        self.inner.state.borrow().value.clone()
    }

    /// The most recently committed error.
    pub fn error(&self) -> Option<E> {
        self.inner.state.borrow().error.clone()
    }

    /// A full snapshot of the current state.
    pub fn state(&self) -> ResourceState<T, E> {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    ///
    /// The receiver observes every commit (loading flips included).
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T, E>> {
        self.inner.state.subscribe()
    }

    /// Wait until no fetch is in flight and return the settled snapshot.
    pub async fn settled(&self) -> ResourceState<T, E> {
        let mut receiver = self.inner.state.subscribe();
        loop {
            {
                let state = receiver.borrow_and_update();
                if !state.loading {
                    return state.clone();
                }
            }
            if receiver.changed().await.is_err() {
                return self.inner.state.borrow().clone();
            }
        }
    }

    /// Re-execute the fetch.
    ///
    /// Uses `vars` when supplied, otherwise the variables of the previous
    /// fetch. Resolves with the committed result, or `None` when the fetch
    /// was superseded by a newer one or the scope was disposed.
    pub async fn refetch(&self, vars: Option<V>) -> Option<Result<T, E>> {
        let vars = vars.unwrap_or_else(|| self.inner.last_vars.lock().clone());
        load(&self.inner, vars).await.ok()
    }
}

fn dispose<V, T, E>(inner: &Arc<ResourceInner<V, T, E>>) {
    inner.disposed.store(true, Ordering::Release);
    if let Some(token) = inner.inflight.lock().take() {
        token.cancel();
    }
    // The cancelled fetch never commits, so settle the snapshot here or
    // `loading` would read true forever and `settled` waiters would never
    // wake. The commit lock serializes against a completion racing the
    // cancel.
    let _commit = inner.commit.lock();
    inner.state.send_modify(|state| state.loading = false);
}

/// Issue a fetch for `vars`. The returned receiver resolves with the result
/// once committed; it resolves with an error (mapped to `None` by callers)
/// when the fetch never commits.
fn load<V, T, E>(
    inner: &Arc<ResourceInner<V, T, E>>,
    vars: V,
) -> oneshot::Receiver<Result<T, E>>
where
    V: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let (done_tx, done_rx) = oneshot::channel();
    if inner.disposed.load(Ordering::Acquire) {
        return done_rx;
    }

    let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
    *inner.last_vars.lock() = vars.clone();

    let token = CancellationToken::new();
    if let Some(previous) = inner.inflight.lock().replace(token.clone()) {
        previous.cancel();
    }

    inner.state.send_modify(|state| state.loading = true);
    tracing::debug!(
        target: "meridian_reactive::resource",
        generation,
        "issuing fetch"
    );

    let future = (inner.fetcher)(vars);
    let task_inner = inner.clone();
    Runtime::global().handle().spawn(async move {
        let result = tokio::select! {
            _ = token.cancelled() => {
                tracing::trace!(
                    target: "meridian_reactive::resource",
                    generation,
                    "fetch cancelled"
                );
                return;
            }
            result = future => result,
        };

        let _commit = task_inner.commit.lock();
        if task_inner.disposed.load(Ordering::Acquire)
            || task_inner.generation.load(Ordering::SeqCst) != generation
        {
            tracing::trace!(
                target: "meridian_reactive::resource",
                generation,
                "discarding superseded fetch result"
            );
            return;
        }

        task_inner.state.send_modify(|state| {
            state.loading = false;
            match &result {
                Ok(value) => {
                    state.value = Some(value.clone());
                    state.error = None;
                }
                Err(error) => {
                    state.error = Some(error.clone());
                    state.value = None;
                }
            }
        });
        let _ = done_tx.send(result);
    });

    done_rx
}
