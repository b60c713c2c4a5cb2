//! Reactive primitives for Meridian.
//!
//! This crate provides the reactive building blocks the Meridian GraphQL
//! bindings are built on:
//!
//! - **Signals**: Shared reactive values with change notification
//! - **Scopes**: Disposal scopes that run registered cleanups exactly once
//! - **Effects**: Bodies that re-run when a watched signal changes
//! - **Resources**: Async fetches paired with loading/error/data snapshots
//! - **Runtime**: A global Tokio runtime for spawning reactive work
//!
//! # Signal Example
//!
//! ```
//! use meridian_reactive::Signal;
//!
//! let count = Signal::new(0);
//!
//! let id = count.subscribe(|value| {
//!     println!("count changed to {}", value);
//! });
//!
//! count.set(1); // notifies
//! count.set(1); // no change, no notification
//!
//! count.unsubscribe(id);
//! ```
//!
//! # Effect Example
//!
//! ```
//! use meridian_reactive::{watch, Scope, Signal};
//!
//! let scope = Scope::new();
//! let name = Signal::new("world".to_string());
//!
//! watch(&scope, &name, |value| {
//!     println!("hello, {}", value);
//!     None // no per-run teardown
//! });
//!
//! name.set("meridian".to_string()); // effect re-runs
//! scope.dispose();
//! ```

mod effect;
mod resource;
mod runtime;
mod scope;
mod signal;

pub use effect::{watch, Teardown};
pub use resource::{Resource, ResourceState, Source};
pub use runtime::{CancellationToken, Runtime, TaskHandle};
pub use scope::Scope;
pub use signal::{Signal, SubscriberId};
