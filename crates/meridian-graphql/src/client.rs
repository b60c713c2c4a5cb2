//! The client capability and its shared handle.
//!
//! This crate performs no transport work. A [`GraphqlClient`] implementor
//! owns execution, caching, and retries; the bindings only adapt its
//! results into reactive state. [`Client`] is the cheap-to-clone handle the
//! bindings hold, with typed wrappers that serialize variables and
//! deserialize payloads around the untyped trait surface.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, OperationError};
use crate::operation::{Operation, Request, RequestOptions};
use crate::response::Response;

/// An event stream returned by [`Client::subscription`].
pub type SubscriptionStream<D> = BoxStream<'static, Result<Response<D>, OperationError>>;

/// The capability a GraphQL client implementation provides.
///
/// Object-safe so the bindings can hold `Arc<dyn GraphqlClient>`. Dropping
/// the stream returned by [`GraphqlClient::subscribe`] must unsubscribe.
pub trait GraphqlClient: Send + Sync {
    /// Execute a single-shot operation (query or mutation).
    fn execute(&self, request: Request) -> BoxFuture<'static, Result<Response<Value>, ClientError>>;

    /// Open a live event stream for a subscription operation.
    fn subscribe(
        &self,
        request: Request,
    ) -> BoxStream<'static, Result<Response<Value>, ClientError>>;
}

/// A shared handle to a [`GraphqlClient`].
#[derive(Clone)]
pub struct Client {
    inner: Arc<dyn GraphqlClient>,
}

impl Client {
    /// Wrap a client implementation.
    pub fn new(client: impl GraphqlClient + 'static) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    /// Wrap an already-shared client implementation.
    pub fn from_arc(client: Arc<dyn GraphqlClient>) -> Self {
        Self { inner: client }
    }

    /// Execute a query and normalize the response into data or a failure.
    pub async fn query<D, V>(
        &self,
        operation: &Operation<D, V>,
        variables: &V,
        options: &RequestOptions,
    ) -> Result<D, OperationError>
    where
        D: DeserializeOwned,
        V: Serialize,
    {
        self.execute_typed(operation, variables, options).await
    }

    /// Execute a mutation and normalize the response into data or a failure.
    pub async fn mutation<D, V>(
        &self,
        operation: &Operation<D, V>,
        variables: &V,
        options: &RequestOptions,
    ) -> Result<D, OperationError>
    where
        D: DeserializeOwned,
        V: Serialize,
    {
        self.execute_typed(operation, variables, options).await
    }

    /// Open a subscription stream with per-event typed responses.
    ///
    /// Each event keeps its `errors` array intact so the caller decides how
    /// execution errors are surfaced.
    pub fn subscription<D, V>(
        &self,
        operation: &Operation<D, V>,
        variables: &V,
        options: &RequestOptions,
    ) -> Result<SubscriptionStream<D>, OperationError>
    where
        D: DeserializeOwned + Send + 'static,
        V: Serialize,
    {
        let request = build_request(operation, variables, options)?;
        let stream = self.inner.subscribe(request);
        Ok(stream
            .map(|event| match event {
                Ok(response) => response.into_typed::<D>().map_err(OperationError::Client),
                Err(error) => Err(OperationError::Client(error)),
            })
            .boxed())
    }

    async fn execute_typed<D, V>(
        &self,
        operation: &Operation<D, V>,
        variables: &V,
        options: &RequestOptions,
    ) -> Result<D, OperationError>
    where
        D: DeserializeOwned,
        V: Serialize,
    {
        let request = build_request(operation, variables, options)?;
        let response = self.inner.execute(request).await?;
        response
            .into_typed::<D>()
            .map_err(OperationError::Client)?
            .ok_data()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish()
    }
}

fn build_request<D, V: Serialize>(
    operation: &Operation<D, V>,
    variables: &V,
    options: &RequestOptions,
) -> Result<Request, OperationError> {
    let variables = serde_json::to_value(variables)
        .map_err(|e| OperationError::Client(ClientError::Json(e.to_string())))?;
    // Unit variables serialize to null; the wire payload omits them.
    let variables = match variables {
        Value::Null => None,
        value => Some(value),
    };
    Ok(Request {
        query: operation.document().to_string(),
        variables,
        operation_name: options
            .operation_name
            .clone()
            .or_else(|| operation.name().map(str::to_string)),
        extensions: options.extensions.clone(),
        kind: operation.kind(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;
    use futures_util::{stream, FutureExt};
    use parking_lot::Mutex;
    use serde_json::json;

    struct RecordingClient {
        requests: Arc<Mutex<Vec<Request>>>,
        response: Response<Value>,
    }

    impl GraphqlClient for RecordingClient {
        fn execute(
            &self,
            request: Request,
        ) -> BoxFuture<'static, Result<Response<Value>, ClientError>> {
            self.requests.lock().push(request);
            let response = self.response.clone();
            async move { Ok(response) }.boxed()
        }

        fn subscribe(
            &self,
            request: Request,
        ) -> BoxStream<'static, Result<Response<Value>, ClientError>> {
            self.requests.lock().push(request);
            stream::iter(vec![Ok(self.response.clone())]).boxed()
        }
    }

    #[derive(Debug, Clone, PartialEq, serde::Deserialize)]
    struct Payload {
        value: u32,
    }

    #[derive(serde::Serialize)]
    struct Vars {
        id: u32,
    }

    #[tokio::test]
    async fn test_query_serializes_variables_and_types_response() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let client = Client::new(RecordingClient {
            requests: requests.clone(),
            response: Response::from_data(json!({"value": 7})),
        });

        let operation: Operation<Payload, Vars> =
            Operation::query("query($id: ID!) { value(id: $id) }");
        let data = client
            .query(&operation, &Vars { id: 9 }, &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(data, Payload { value: 7 });

        let sent = requests.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].variables, Some(json!({"id": 9})));
        assert_eq!(sent[0].kind, OperationKind::Query);
    }

    #[tokio::test]
    async fn test_unit_variables_are_omitted() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let client = Client::new(RecordingClient {
            requests: requests.clone(),
            response: Response::from_data(json!({"value": 1})),
        });

        let operation: Operation<Payload> = Operation::query("{ value }");
        client
            .query(&operation, &(), &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(requests.lock()[0].variables, None);
    }

    #[tokio::test]
    async fn test_options_override_operation_name() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let client = Client::new(RecordingClient {
            requests: requests.clone(),
            response: Response::from_data(json!({"value": 1})),
        });

        let operation: Operation<Payload> =
            Operation::query("query A { value } query B { value }").operation_name("A");
        let options = RequestOptions::new().operation_name("B");
        client.query(&operation, &(), &options).await.unwrap();

        assert_eq!(requests.lock()[0].operation_name, Some("B".to_string()));
    }

    #[tokio::test]
    async fn test_execution_errors_become_operation_error() {
        let client = Client::new(RecordingClient {
            requests: Arc::new(Mutex::new(Vec::new())),
            response: Response::from_errors(vec![crate::response::GraphqlError::new("denied")]),
        });

        let operation: Operation<Payload> = Operation::query("{ value }");
        let result = client
            .query(&operation, &(), &RequestOptions::default())
            .await;

        match result {
            Err(OperationError::Graphql(errors)) => assert_eq!(errors[0].message, "denied"),
            other => panic!("expected GraphQL error, got {:?}", other),
        }
    }
}
