//! Reactive value cells with change notification.
//!
//! A [`Signal<T>`] holds a current value and a set of subscribers that are
//! invoked whenever the value changes. Writes through [`Signal::set`] are
//! deduplicated by equality: setting the value a signal already holds is a
//! no-op and notifies nobody. [`Signal::replace`] writes unconditionally for
//! payloads where every delivery matters (or where `PartialEq` is not
//! available).
//!
//! Cloning a `Signal` clones the *handle*: both handles read and write the
//! same underlying cell.
//!
//! # Example
//!
//! ```
//! use meridian_reactive::Signal;
//!
//! let temperature = Signal::new(21);
//!
//! let id = temperature.subscribe(|t| println!("now {} degrees", t));
//!
//! assert!(temperature.set(22));  // changed, subscribers ran
//! assert!(!temperature.set(22)); // unchanged, nothing happened
//!
//! temperature.unsubscribe(id);
//! ```

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// A unique identifier for a signal subscriber.
    ///
    /// Returned by [`Signal::subscribe`] and consumed by
    /// [`Signal::unsubscribe`]. The id stays valid until the subscriber is
    /// removed or the last signal handle is dropped.
    pub struct SubscriberId;
}

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    value: RwLock<T>,
    subscribers: Mutex<SlotMap<SubscriberId, Subscriber<T>>>,
}

/// A shared reactive value.
///
/// `Signal<T>` is `Send + Sync` when `T` is, and is cheap to clone: handles
/// share the same cell. Subscribers run synchronously on the thread that
/// performs the write, after the value lock has been released.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> Signal<T> {
    /// Create a new signal holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                value: RwLock::new(value),
                subscribers: Mutex::new(SlotMap::with_key()),
            }),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, prefer [`Signal::with`].
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Access the current value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.value.read())
    }

    /// Write the value unconditionally and notify all subscribers.
    ///
    /// Unlike [`Signal::set`] this performs no equality check, so it works
    /// for types without `PartialEq` and guarantees subscribers observe
    /// every write.
    pub fn replace(&self, value: T) {
        *self.inner.value.write() = value.clone();
        self.notify(&value);
    }

    /// Subscribe to value changes.
    ///
    /// The callback is invoked with the new value after every effective
    /// write. Returns a [`SubscriberId`] for [`Signal::unsubscribe`].
    pub fn subscribe<F>(&self, f: F) -> SubscriberId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.subscribers.lock().insert(Arc::new(f))
    }

    /// Remove a subscriber by id.
    ///
    /// Returns `true` if the subscriber was found and removed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.lock().remove(id).is_some()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    fn notify(&self, value: &T) {
        // Snapshot subscribers so callbacks may subscribe/unsubscribe
        // without deadlocking.
        let subscribers: Vec<Subscriber<T>> =
            self.inner.subscribers.lock().values().cloned().collect();
        tracing::trace!(
            target: "meridian_reactive::signal",
            subscriber_count = subscribers.len(),
            "notifying signal subscribers"
        );
        for subscriber in subscribers {
            subscriber(value);
        }
    }
}

impl<T: Clone + PartialEq> Signal<T> {
    /// Set the value, returning `true` if it changed.
    ///
    /// The new value is compared with the current one; when equal, nothing
    /// is written and no subscriber runs. This is the deduplication the
    /// higher layers rely on to decide whether reactive work re-executes.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notify(&value);
        true
    }
}

impl<T: Clone + Default> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("value", &self.get()).finish()
    }
}
