//! Error types for GraphQL operations.

use thiserror::Error;

use crate::response::GraphqlError;

/// A failure raised by a client implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The transport failed to deliver the request or response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A payload failed to serialize or deserialize.
    #[error("JSON error: {0}")]
    Json(String),

    /// The client has shut down and accepts no further operations.
    #[error("client closed")]
    Closed,

    /// The operation was cancelled before completing.
    #[error("operation cancelled")]
    Cancelled,

    /// The response carried neither data nor errors.
    #[error("response carried no data")]
    MissingData,
}

/// The single failure type the bindings surface.
///
/// Execution errors reported by the server and client-side failures travel
/// the same channel, so observers handle one error, not two.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    /// The server reported execution errors.
    #[error("GraphQL operation failed: {}", join_messages(.0))]
    Graphql(Vec<GraphqlError>),

    /// The client failed before a response was produced.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl OperationError {
    /// The server-reported errors, when this is an execution failure.
    pub fn graphql_errors(&self) -> Option<&[GraphqlError]> {
        match self {
            Self::Graphql(errors) => Some(errors),
            Self::Client(_) => None,
        }
    }
}

fn join_messages(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_display_joins_messages() {
        let error = OperationError::Graphql(vec![
            GraphqlError::new("first"),
            GraphqlError::new("second"),
        ]);
        assert_eq!(
            error.to_string(),
            "GraphQL operation failed: first; second"
        );
    }

    #[test]
    fn test_client_error_is_transparent() {
        let error: OperationError = ClientError::Transport("connection refused".into()).into();
        assert_eq!(error.to_string(), "transport error: connection refused");
    }

    #[test]
    fn test_graphql_errors_accessor() {
        let error = OperationError::Graphql(vec![GraphqlError::new("boom")]);
        assert_eq!(error.graphql_errors().map(<[_]>::len), Some(1));

        let error: OperationError = ClientError::Closed.into();
        assert!(error.graphql_errors().is_none());
    }
}
