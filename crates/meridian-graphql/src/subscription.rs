//! Subscription bindings: a live GraphQL stream feeding a signal.
//!
//! A [`SubscriptionBinding`] holds at most one live stream. When the
//! variables source changes, the previous stream is torn down synchronously
//! before the next one opens; when the owning scope is disposed, the last
//! stream is torn down and nothing is delivered afterwards, even if the
//! underlying transport keeps pushing events.

use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::StreamExt;
use meridian_reactive::{watch, Runtime, Scope, Signal, Source, Teardown};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::Client;
use crate::context::current_client;
use crate::error::OperationError;
use crate::operation::{Operation, RequestOptions};

type ErrorCallback = Arc<dyn Fn(OperationError) + Send + Sync>;

struct StreamContext<Data, Vars> {
    client: Client,
    operation: Operation<Data, Vars>,
    options: RequestOptions,
    data: Signal<Option<Data>>,
    on_error: Option<ErrorCallback>,
}

/// A subscription bound to reactive variables.
///
/// The latest event payload is exposed as a `Signal<Option<Data>>`; it
/// starts as `None` and is written unconditionally on every data event, so
/// identical consecutive payloads still notify. Error events never touch
/// the signal: they go to the error callback when one is set, and are
/// logged and dropped otherwise.
pub struct SubscriptionBinding<Data, Vars = ()> {
    data: Signal<Option<Data>>,
    _marker: PhantomData<fn() -> Vars>,
}

impl<Data, Vars> SubscriptionBinding<Data, Vars>
where
    Data: DeserializeOwned + Clone + Send + Sync + 'static,
    Vars: Serialize + Clone + Send + Sync + 'static,
{
    /// Start configuring a subscription for `operation`.
    pub fn builder(operation: Operation<Data, Vars>) -> SubscriptionBuilder<Data, Vars> {
        SubscriptionBuilder {
            operation,
            options: RequestOptions::default(),
            client: None,
            on_error: None,
        }
    }

    /// Bind a subscription using the ambient client, with no error callback.
    ///
    /// # Panics
    ///
    /// Panics when no ambient client is installed; see
    /// [`ClientScope::install`](crate::ClientScope::install).
    pub fn new(
        scope: &Scope,
        operation: Operation<Data, Vars>,
        variables: impl Into<Source<Vars>>,
    ) -> Self {
        Self::builder(operation).start(scope, variables)
    }

    /// The latest event payload, if any has arrived.
    pub fn data(&self) -> Option<Data> {
        self.data.get()
    }

    /// The payload signal, for subscribing to events.
    pub fn signal(&self) -> &Signal<Option<Data>> {
        &self.data
    }
}

impl<Data, Vars> std::fmt::Debug for SubscriptionBinding<Data, Vars> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionBinding").finish()
    }
}

/// Configures and starts a [`SubscriptionBinding`].
pub struct SubscriptionBuilder<Data, Vars = ()> {
    operation: Operation<Data, Vars>,
    options: RequestOptions,
    client: Option<Client>,
    on_error: Option<ErrorCallback>,
}

impl<Data, Vars> SubscriptionBuilder<Data, Vars>
where
    Data: DeserializeOwned + Clone + Send + Sync + 'static,
    Vars: Serialize + Clone + Send + Sync + 'static,
{
    /// Use an explicit client instead of the ambient one.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Attach request options.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Receive stream and execution errors through `callback`.
    ///
    /// Without a callback, errors are logged at debug level and dropped.
    pub fn on_error(mut self, callback: impl Fn(OperationError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Open the subscription, tied to `scope`.
    ///
    /// The first stream opens immediately with the source's current value.
    pub fn start(
        self,
        scope: &Scope,
        variables: impl Into<Source<Vars>>,
    ) -> SubscriptionBinding<Data, Vars> {
        let client = self.client.unwrap_or_else(current_client);
        let context = Arc::new(StreamContext {
            client,
            operation: self.operation,
            options: self.options,
            data: Signal::new(None),
            on_error: self.on_error,
        });

        match variables.into() {
            Source::Constant(vars) => {
                let teardown = open_stream(&context, &vars);
                scope.on_cleanup(move || teardown());
            }
            Source::Signal(signal) => {
                let watch_context = context.clone();
                watch(scope, &signal, move |vars| {
                    Some(open_stream(&watch_context, vars))
                });
            }
        }

        SubscriptionBinding {
            data: context.data.clone(),
            _marker: PhantomData,
        }
    }
}

/// Open one stream run and return its teardown.
///
/// The teardown closes the delivery gate and cancels the drain task. The
/// gate is held across each delivery, so by the time teardown returns no
/// further signal write or callback invocation can happen.
fn open_stream<Data, Vars>(context: &Arc<StreamContext<Data, Vars>>, vars: &Vars) -> Teardown
where
    Data: DeserializeOwned + Clone + Send + Sync + 'static,
    Vars: Serialize + Clone + Send + Sync + 'static,
{
    let stream = match context
        .client
        .subscription(&context.operation, vars, &context.options)
    {
        Ok(stream) => stream,
        Err(error) => {
            deliver_error(context, error);
            return Box::new(|| {});
        }
    };

    tracing::debug!(
        target: "meridian_graphql::subscription",
        operation = ?context.operation.name(),
        "opening subscription stream"
    );

    let gate = Arc::new(Mutex::new(true));
    let task_gate = gate.clone();
    let task_context = context.clone();

    let (handle, token) = Runtime::global().spawn_cancellable(move |token| async move {
        let mut stream = stream;
        loop {
            let event = tokio::select! {
                _ = token.cancelled() => break,
                event = stream.next() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let guard = task_gate.lock();
            if !*guard {
                break;
            }
            match event {
                Ok(response) => {
                    if response.has_errors() {
                        deliver_error(&task_context, OperationError::Graphql(response.errors));
                    } else if let Some(data) = response.data {
                        task_context.data.replace(Some(data));
                    }
                }
                Err(error) => deliver_error(&task_context, error),
            }
            drop(guard);
        }
        tracing::trace!(
            target: "meridian_graphql::subscription",
            "subscription drain ended"
        );
    });

    Box::new(move || {
        // Acquiring the gate waits out an in-flight delivery; after the
        // store, the drain task delivers nothing.
        *gate.lock() = false;
        token.cancel();
        drop(handle);
    })
}

fn deliver_error<Data, Vars>(context: &StreamContext<Data, Vars>, error: OperationError) {
    match &context.on_error {
        Some(callback) => callback(error),
        None => tracing::debug!(
            target: "meridian_graphql::subscription",
            error = %error,
            "dropping subscription error: no error callback set"
        ),
    }
}
