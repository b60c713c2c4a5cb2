//! Reactive GraphQL bindings for Meridian.
//!
//! This crate adapts an external GraphQL client's operations into reactive
//! state a UI layer can observe. It implements no transport, caching, or
//! retry policy of its own; all of that lives behind the [`GraphqlClient`]
//! trait, and the bindings translate its results into the primitives from
//! `meridian-reactive`:
//!
//! - [`QueryBinding`]: a query re-executed on variable changes, exposed as
//!   independent `data`/`loading`/`error` state
//! - [`MutationBinding`]: an on-demand execution cycle through a closed
//!   `Idle -> Fetching -> Success | Error` state machine
//! - [`SubscriptionBinding`]: a live stream feeding a signal, torn down
//!   when variables change or the owning scope ends
//!
//! Clients are passed explicitly or installed ambiently with
//! [`ClientScope::install`], which binding constructors resolve through
//! [`current_client`].
//!
//! # Example
//!
//! ```no_run
//! use meridian_graphql::{Client, ClientScope, Operation, QueryBinding};
//! use meridian_reactive::{Scope, Signal};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Deserialize)]
//! struct TodoData {
//!     todo: String,
//! }
//!
//! #[derive(Clone, PartialEq, Serialize)]
//! struct TodoVars {
//!     id: u32,
//! }
//!
//! # fn transport() -> Client { unimplemented!() }
//! let _guard = ClientScope::install(transport());
//!
//! let scope = Scope::new();
//! let id = Signal::new(TodoVars { id: 1 });
//!
//! let operation: Operation<TodoData, TodoVars> =
//!     Operation::query("query($id: ID!) { todo(id: $id) }");
//! let query = QueryBinding::new(&scope, operation, id.clone());
//!
//! id.set(TodoVars { id: 2 }); // re-executes the query
//! ```

mod client;
mod context;
mod error;
mod mutation;
mod operation;
mod query;
mod response;
mod subscription;

pub use client::{Client, GraphqlClient, SubscriptionStream};
pub use context::{current_client, try_current_client, ClientScope};
pub use error::{ClientError, OperationError};
pub use mutation::{Completion, MutationBinding, MutationState, MutationStatus};
pub use operation::{Operation, OperationKind, Request, RequestOptions};
pub use query::QueryBinding;
pub use response::{GraphqlError, Location, PathSegment, Response};
pub use subscription::{SubscriptionBinding, SubscriptionBuilder};

// Re-exported so downstream code can name the reactive inputs the bindings
// take without a separate dependency.
pub use meridian_reactive::{Scope, Signal, Source};
