//! Integration tests for mutation bindings over a mock client.

mod common;

use std::sync::Arc;

use common::MockClient;
use meridian_graphql::{
    ClientError, MutationBinding, MutationStatus, Operation, OperationError, RequestOptions,
    Response,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

fn mutation_operation() -> Operation<Value, Value> {
    Operation::mutation("mutation($input: Input!) { apply(input: $input) { ok } }")
}

fn binding(mock: &MockClient) -> MutationBinding<Value, Value> {
    MutationBinding::with_client(mock.client(), mutation_operation(), RequestOptions::default())
}

#[tokio::test]
async fn test_starts_idle() {
    let mock = MockClient::new();
    let mutation = binding(&mock);

    assert_eq!(mutation.status(), MutationStatus::Idle);
    assert_eq!(mutation.data(), None);
    assert_eq!(mutation.error(), None);
    assert!(!mutation.is_fetching());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_execute_is_fetching_before_returning() {
    let mock = MockClient::new();
    let pending = mock.expect_execute();
    let mutation = binding(&mock);

    let completion = mutation.execute(json!({"id": 1}));

    // The transition happens synchronously inside execute, not on the
    // spawned task.
    assert!(mutation.is_fetching());

    pending
        .send(Ok(Response::from_data(json!({"ok": true}))))
        .unwrap();
    completion.await;

    assert_eq!(mutation.status(), MutationStatus::Success);
    assert_eq!(mutation.data(), Some(json!({"ok": true})));
}

#[tokio::test]
async fn test_failure_commits_error_but_completion_resolves() {
    let mock = MockClient::new();
    mock.respond_with(Err(ClientError::Transport("fail".into())));
    let mutation = binding(&mock);

    // Awaiting the completion must not fail even though the mutation did.
    mutation.execute(json!({})).await;

    assert_eq!(mutation.status(), MutationStatus::Error);
    let error = mutation.error().unwrap();
    assert!(error.to_string().contains("fail"));
    assert_eq!(mutation.data(), None);
}

#[tokio::test]
async fn test_graphql_errors_commit_error_state() {
    let mock = MockClient::new();
    mock.respond_with(Ok(Response::from_errors(vec![
        meridian_graphql::GraphqlError::new("rejected"),
    ])));
    let mutation = binding(&mock);

    mutation.execute(json!({})).await;

    match mutation.error() {
        Some(OperationError::Graphql(errors)) => assert_eq!(errors[0].message, "rejected"),
        other => panic!("expected GraphQL error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_re_execute_restarts_from_fetching() {
    let mock = MockClient::new();
    let mutation = binding(&mock);

    let transitions = Arc::new(Mutex::new(Vec::new()));
    let transitions_clone = transitions.clone();
    mutation.signal().subscribe(move |state| {
        transitions_clone.lock().push(state.status());
    });

    mock.respond_with(Ok(Response::from_data(json!({"ok": 1}))));
    mutation.execute(json!({})).await;

    // A second execution restarts the cycle even after a terminal state.
    mock.respond_with(Err(ClientError::Transport("late".into())));
    mutation.execute(json!({})).await;

    assert_eq!(
        *transitions.lock(),
        vec![
            MutationStatus::Fetching,
            MutationStatus::Success,
            MutationStatus::Fetching,
            MutationStatus::Error,
        ]
    );
}

#[tokio::test]
async fn test_variables_reach_the_wire() {
    let mock = MockClient::new();
    mock.respond_with(Ok(Response::from_data(json!({"ok": true}))));
    let mutation = binding(&mock);

    mutation.execute(json!({"name": "meridian"})).await;

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].variables, Some(json!({"name": "meridian"})));
}
