//! Query bindings: a GraphQL query as reactive loading/data/error state.

use std::sync::Arc;

use futures_util::FutureExt;
use meridian_reactive::{Resource, ResourceState, Scope, Source};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::client::Client;
use crate::context::current_client;
use crate::error::OperationError;
use crate::operation::{Operation, RequestOptions};

/// A query bound to reactive variables.
///
/// The query executes once at construction and again whenever the variables
/// source changes (changes are deduplicated by equality). The result is
/// exposed as independent `data`/`loading`/`error` accessors: `loading` is
/// `true` exactly while a fetch for the latest variables is in flight, and
/// data and error are never both populated.
///
/// While a re-fetch is in flight the previous data stays readable.
pub struct QueryBinding<Data, Vars = ()> {
    resource: Resource<Vars, Data, OperationError>,
}

impl<Data, Vars> QueryBinding<Data, Vars>
where
    Data: DeserializeOwned + Clone + Send + Sync + 'static,
    Vars: Serialize + Clone + Send + Sync + 'static,
{
    /// Bind a query using the ambient client.
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
        Self::with_client(
            scope,
            current_client(),
            operation,
            variables,
            RequestOptions::default(),
        )
    }

    /// Bind a query using the ambient client with request options.
    pub fn with_options(
        scope: &Scope,
        operation: Operation<Data, Vars>,
        variables: impl Into<Source<Vars>>,
        options: RequestOptions,
    ) -> Self {
        Self::with_client(scope, current_client(), operation, variables, options)
    }

    /// Bind a query to an explicit client.
    pub fn with_client(
        scope: &Scope,
        client: Client,
        operation: Operation<Data, Vars>,
        variables: impl Into<Source<Vars>>,
        options: RequestOptions,
    ) -> Self {
        let operation = Arc::new(operation);
        let options = Arc::new(options);

        let fetcher = move |vars: Vars| {
            let client = client.clone();
            let operation = operation.clone();
            let options = options.clone();
            async move {
                tracing::debug!(
                    target: "meridian_graphql::query",
                    operation = ?operation.name(),
                    "executing query"
                );
                client.query(&operation, &vars, &options).await
            }
            .boxed()
        };

        Self {
            resource: Resource::new(scope, variables, fetcher),
        }
    }

    /// The most recently committed data.
    pub fn data(&self) -> Option<Data> {
        self.resource.value()
    }

    /// The most recently committed failure.
    pub fn error(&self) -> Option<OperationError> {
        self.resource.error()
    }

    /// Whether a fetch for the latest variables is in flight.
    pub fn loading(&self) -> bool {
        self.resource.loading()
    }

    /// A full snapshot of the current state.
    pub fn state(&self) -> ResourceState<Data, OperationError> {
        self.resource.state()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<Data, OperationError>> {
        self.resource.subscribe()
    }

    /// Wait until no fetch is in flight and return the settled snapshot.
    pub async fn settled(&self) -> ResourceState<Data, OperationError> {
        self.resource.settled().await
    }

    /// Re-execute the query.
    ///
    /// Uses `vars` when supplied, otherwise the variables of the previous
    /// fetch. Resolves with the committed result, or `None` when the fetch
    /// was superseded by a newer one or the scope was disposed.
    pub async fn refetch(&self, vars: Option<Vars>) -> Option<Result<Data, OperationError>> {
        self.resource.refetch(vars).await
    }
}

impl<Data, Vars> std::fmt::Debug for QueryBinding<Data, Vars>
where
    Data: DeserializeOwned + Clone + Send + Sync + 'static,
    Vars: Serialize + Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBinding")
            .field("loading", &self.loading())
            .finish()
    }
}
