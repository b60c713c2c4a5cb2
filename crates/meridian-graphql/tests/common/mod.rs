//! Shared test support: a channel-driven mock client.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{stream, FutureExt, StreamExt};
use meridian_graphql::{Client, ClientError, GraphqlClient, Request, Response};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

type WireResult = Result<Response<Value>, ClientError>;

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<Request>>,
    executions: Mutex<VecDeque<oneshot::Receiver<WireResult>>>,
    streams: Mutex<VecDeque<mpsc::UnboundedReceiver<WireResult>>>,
}

/// Test-side handle over a mock transport.
///
/// Single-shot executions resolve from a queue of one-shot channels; the
/// test either queues a ready result with [`MockClient::respond_with`] or
/// holds the sender from [`MockClient::expect_execute`] to keep the request
/// in flight. Subscription streams drain queued unbounded channels.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<MockState>,
}

struct MockTransport {
    state: Arc<MockState>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a `Client` over this mock.
    pub fn client(&self) -> Client {
        Client::new(MockTransport {
            state: self.state.clone(),
        })
    }

    /// Queue one execution that stays in flight until the sender fires.
    pub fn expect_execute(&self) -> oneshot::Sender<WireResult> {
        let (tx, rx) = oneshot::channel();
        self.state.executions.lock().push_back(rx);
        tx
    }

    /// Queue one execution that resolves immediately with `result`.
    pub fn respond_with(&self, result: WireResult) {
        let tx = self.expect_execute();
        let _ = tx.send(result);
    }

    /// Queue one subscription stream, returning its event sender.
    pub fn push_stream(&self) -> mpsc::UnboundedSender<WireResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.streams.lock().push_back(rx);
        tx
    }

    /// All requests the mock has received, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.state.requests.lock().clone()
    }
}

impl GraphqlClient for MockTransport {
    fn execute(&self, request: Request) -> BoxFuture<'static, WireResult> {
        self.state.requests.lock().push(request);
        let receiver = self.state.executions.lock().pop_front();
        async move {
            match receiver {
                Some(receiver) => receiver.await.unwrap_or(Err(ClientError::Closed)),
                None => Err(ClientError::Closed),
            }
        }
        .boxed()
    }

    fn subscribe(&self, request: Request) -> BoxStream<'static, WireResult> {
        self.state.requests.lock().push(request);
        match self.state.streams.lock().pop_front() {
            Some(receiver) => {
                stream::unfold(receiver, |mut receiver| async move {
                    receiver.recv().await.map(|event| (event, receiver))
                })
                .boxed()
            }
            None => stream::empty().boxed(),
        }
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}
