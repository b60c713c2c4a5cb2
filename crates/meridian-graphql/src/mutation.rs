//! Mutation bindings: a four-state machine driven by explicit execution.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use meridian_reactive::{Runtime, Signal};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::client::Client;
use crate::context::current_client;
use crate::error::OperationError;
use crate::operation::{Operation, RequestOptions};

/// The tag of a [`MutationState`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// Never executed.
    Idle,
    /// An execution is in flight.
    Fetching,
    /// The last execution committed data.
    Success,
    /// The last execution failed.
    Error,
}

/// The state of a mutation.
///
/// Exactly one variant holds at any time; there is no way to carry data and
/// an error simultaneously, and no state outside these four exists.
#[derive(Debug, Clone)]
pub enum MutationState<Data> {
    /// Never executed.
    Idle,
    /// An execution is in flight.
    Fetching,
    /// The last execution committed `Data`.
    Success(Data),
    /// The last execution failed.
    Error(OperationError),
}

impl<Data> MutationState<Data> {
    /// The variant tag.
    pub fn status(&self) -> MutationStatus {
        match self {
            Self::Idle => MutationStatus::Idle,
            Self::Fetching => MutationStatus::Fetching,
            Self::Success(_) => MutationStatus::Success,
            Self::Error(_) => MutationStatus::Error,
        }
    }

    /// The committed data, when in `Success`.
    pub fn data(&self) -> Option<&Data> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// The committed failure, when in `Error`.
    pub fn error(&self) -> Option<&OperationError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Whether an execution is in flight.
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching)
    }
}

/// Resolves once a mutation execution has committed its terminal state.
///
/// The completion itself never fails: a failed mutation still resolves it,
/// and the failure is observable only through the state signal. Callers that
/// branch on the outcome read the state after awaiting.
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<()>,
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|_| ())
    }
}

/// A mutation bound to a client, executed on demand.
///
/// Unlike queries, nothing runs at construction: each [`execute`] call
/// drives one `Fetching -> Success | Error` cycle, restarting from
/// `Fetching` regardless of the previous terminal state. There is no
/// reset-to-idle operation.
///
/// [`execute`]: MutationBinding::execute
pub struct MutationBinding<Data, Vars> {
    client: Client,
    operation: Arc<Operation<Data, Vars>>,
    options: Arc<RequestOptions>,
    state: Signal<MutationState<Data>>,
}

impl<Data, Vars> Clone for MutationBinding<Data, Vars> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            operation: self.operation.clone(),
            options: self.options.clone(),
            state: self.state.clone(),
        }
    }
}

impl<Data, Vars> MutationBinding<Data, Vars>
where
    Data: DeserializeOwned + Clone + Send + Sync + 'static,
    Vars: Serialize + Send + Sync + 'static,
{
    /// Bind a mutation using the ambient client.
    ///
    /// # Panics
    ///
    /// Panics when no ambient client is installed; see
    /// [`ClientScope::install`](crate::ClientScope::install).
    pub fn new(operation: Operation<Data, Vars>) -> Self {
        Self::with_client(current_client(), operation, RequestOptions::default())
    }

    /// Bind a mutation using the ambient client with request options.
    pub fn with_options(operation: Operation<Data, Vars>, options: RequestOptions) -> Self {
        Self::with_client(current_client(), operation, options)
    }

    /// Bind a mutation to an explicit client.
    pub fn with_client(
        client: Client,
        operation: Operation<Data, Vars>,
        options: RequestOptions,
    ) -> Self {
        Self {
            client,
            operation: Arc::new(operation),
            options: Arc::new(options),
            state: Signal::new(MutationState::Idle),
        }
    }

    /// Execute the mutation with `vars`.
    ///
    /// The state transitions to `Fetching` before this returns; the request
    /// then runs on the global runtime and commits `Success` or `Error`.
    /// The returned [`Completion`] resolves after that commit.
    pub fn execute(&self, vars: Vars) -> Completion {
        self.state.replace(MutationState::Fetching);

        let (done_tx, done_rx) = oneshot::channel();
        let client = self.client.clone();
        let operation = self.operation.clone();
        let options = self.options.clone();
        let state = self.state.clone();

        Runtime::global().spawn(async move {
            tracing::debug!(
                target: "meridian_graphql::mutation",
                operation = ?operation.name(),
                "executing mutation"
            );
            match client.mutation(&operation, &vars, &options).await {
                Ok(data) => state.replace(MutationState::Success(data)),
                Err(error) => {
                    tracing::debug!(
                        target: "meridian_graphql::mutation",
                        error = %error,
                        "mutation failed"
                    );
                    state.replace(MutationState::Error(error));
                }
            }
            let _ = done_tx.send(());
        });

        Completion { receiver: done_rx }
    }

    /// The current state.
    pub fn state(&self) -> MutationState<Data> {
        self.state.get()
    }

    /// The current state's tag.
    pub fn status(&self) -> MutationStatus {
        self.state.with(MutationState::status)
    }

    /// The committed data, when the last execution succeeded.
    pub fn data(&self) -> Option<Data> {
        self.state.with(|s| s.data().cloned())
    }

    /// The committed failure, when the last execution failed.
    pub fn error(&self) -> Option<OperationError> {
        self.state.with(|s| s.error().cloned())
    }

    /// Whether an execution is in flight.
    pub fn is_fetching(&self) -> bool {
        self.state.with(MutationState::is_fetching)
    }

    /// The state signal, for subscribing to transitions.
    pub fn signal(&self) -> &Signal<MutationState<Data>> {
        &self.state
    }
}

impl<Data, Vars> std::fmt::Debug for MutationBinding<Data, Vars>
where
    Data: DeserializeOwned + Clone + Send + Sync + 'static,
    Vars: Serialize + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationBinding")
            .field("status", &self.status())
            .finish()
    }
}
