//! Operation descriptors and the untyped wire request.
//!
//! An [`Operation`] pairs a GraphQL document with the Rust types of its
//! response data and variables, so the bindings can serialize variables and
//! deserialize payloads without the caller touching JSON. The [`Request`]
//! is the untyped payload a [`GraphqlClient`](crate::GraphqlClient)
//! implementation actually sends.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of a GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// A query operation (read-only).
    #[default]
    Query,
    /// A mutation operation (modifies data).
    Mutation,
    /// A subscription operation (live updates).
    Subscription,
}

/// A statically-typed GraphQL operation descriptor.
///
/// `Data` is the shape of the response payload, `Vars` the shape of the
/// variables. The descriptor itself holds only the document text, the
/// operation kind, and an optional operation name; the type parameters are
/// phantom and exist so the bindings stay typed end to end.
///
/// # Example
///
/// ```
/// use meridian_graphql::Operation;
/// use serde::Deserialize;
///
/// #[derive(Clone, Deserialize)]
/// struct UserData {
///     user: User,
/// }
///
/// #[derive(Clone, Deserialize)]
/// struct User {
///     id: String,
///     name: String,
/// }
///
/// let operation: Operation<UserData, ()> = Operation::query(
///     "query GetUser { user { id name } }",
/// );
/// ```
pub struct Operation<Data, Vars = ()> {
    document: String,
    kind: OperationKind,
    name: Option<String>,
    _marker: PhantomData<fn() -> (Data, Vars)>,
}

impl<Data, Vars> Clone for Operation<Data, Vars> {
    fn clone(&self) -> Self {
        Self {
            document: self.document.clone(),
            kind: self.kind,
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<Data, Vars> Operation<Data, Vars> {
    fn with_kind(document: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            document: document.into(),
            kind,
            name: None,
            _marker: PhantomData,
        }
    }

    /// Create a query operation.
    pub fn query(document: impl Into<String>) -> Self {
        Self::with_kind(document, OperationKind::Query)
    }

    /// Create a mutation operation.
    pub fn mutation(document: impl Into<String>) -> Self {
        Self::with_kind(document, OperationKind::Mutation)
    }

    /// Create a subscription operation.
    pub fn subscription(document: impl Into<String>) -> Self {
        Self::with_kind(document, OperationKind::Subscription)
    }

    /// Set the operation name.
    ///
    /// Required when the document contains multiple operations.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get the document text.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Get the operation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Get the operation name, if set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<Data, Vars> std::fmt::Debug for Operation<Data, Vars> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}

/// The untyped wire payload handed to a client implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// The GraphQL document.
    pub query: String,

    /// Serialized variables, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,

    /// Operation name (for documents with multiple operations).
    #[serde(skip_serializing_if = "Option::is_none", rename = "operationName")]
    pub operation_name: Option<String>,

    /// Implementation-specific metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,

    /// The operation kind (not serialized; transports route on it).
    #[serde(skip)]
    pub kind: OperationKind,
}

/// Per-call request customization: extensions and an operation-name
/// override, attached when a binding issues a request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Implementation-specific metadata forwarded on the request.
    pub extensions: Option<Value>,
    /// Overrides the descriptor's operation name.
    pub operation_name: Option<String>,
}

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the extensions payload.
    pub fn extensions(mut self, extensions: impl Serialize) -> Self {
        self.extensions = serde_json::to_value(extensions).ok();
        self
    }

    /// Override the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}
