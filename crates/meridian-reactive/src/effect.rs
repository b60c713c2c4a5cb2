//! Effects: reactive bodies keyed to a signal.
//!
//! [`watch`] runs a body immediately with a signal's current value and again
//! after every deduplicated change. The body may return a [`Teardown`]
//! closure; it runs synchronously before the next body invocation and when
//! the owning scope is disposed, so a body that acquires a live resource
//! (a stream, a connection) always releases the previous one first.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::scope::Scope;
use crate::signal::Signal;

/// A per-run teardown closure returned by an effect body.
pub type Teardown = Box<dyn FnOnce() + Send>;

struct EffectState<T> {
    body: Box<dyn FnMut(&T) -> Option<Teardown> + Send>,
    teardown: Option<Teardown>,
    stopped: bool,
}

fn run_effect<T>(state: &Mutex<EffectState<T>>, value: &T) {
    let mut state = state.lock();
    if state.stopped {
        return;
    }
    // Previous teardown runs before the body sees the new value. Holding
    // the lock here serializes re-runs: a torn-down resource is fully
    // released before its successor exists.
    if let Some(teardown) = state.teardown.take() {
        teardown();
    }
    state.teardown = (state.body)(value);
}

/// Watch a signal, re-running `body` on every change.
///
/// The body runs once immediately with the current value. Each run may
/// return a teardown that is invoked before the next run and on scope
/// disposal. Disposal also detaches from the signal, so a signal written
/// after the scope ended triggers nothing.
pub fn watch<T, F>(scope: &Scope, source: &Signal<T>, body: F)
where
    T: Clone + Send + Sync + 'static,
    F: FnMut(&T) -> Option<Teardown> + Send + 'static,
{
    let state = Arc::new(Mutex::new(EffectState {
        body: Box::new(body),
        teardown: None,
        stopped: false,
    }));

    source.with(|value| run_effect(&state, value));

    let subscriber_state = state.clone();
    let id = source.subscribe(move |value| run_effect(&subscriber_state, value));

    let source = source.clone();
    scope.on_cleanup(move || {
        source.unsubscribe(id);
        let teardown = {
            let mut state = state.lock();
            state.stopped = true;
            state.teardown.take()
        };
        if let Some(teardown) = teardown {
            teardown();
        }
    });
}
