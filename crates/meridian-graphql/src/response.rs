//! GraphQL response types.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{ClientError, OperationError};

/// An error returned by the server as part of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    /// The error message.
    pub message: String,

    /// Locations in the document where the error occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,

    /// Additional error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    /// Create an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }
}

impl fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.path.is_empty() {
            write!(f, " (at ")?;
            for (i, segment) in self.path.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                match segment {
                    PathSegment::Field(name) => write!(f, "{}", name)?,
                    PathSegment::Index(index) => write!(f, "[{}]", index)?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphqlError {}

/// A line/column position in a GraphQL document (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Line number.
    pub line: u32,
    /// Column number.
    pub column: u32,
}

/// A segment in an error path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name.
    Field(String),
    /// An array index.
    Index(usize),
}

/// A GraphQL response.
///
/// The wire form is `Response<Value>`; [`Response::into_typed`] converts it
/// into the payload type an operation descriptor declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<Data = Value> {
    /// The data returned by the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,

    /// Errors that occurred during execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,

    /// Additional response metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl<Data> Response<Data> {
    /// Create a successful response carrying `data`.
    pub fn from_data(data: Data) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            extensions: None,
        }
    }

    /// Create a response carrying only errors.
    pub fn from_errors(errors: Vec<GraphqlError>) -> Self {
        Self {
            data: None,
            errors,
            extensions: None,
        }
    }

    /// Check whether the response carries execution errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Normalize the response into data or a single failure.
    ///
    /// A non-empty `errors` array wins over any (partial) data and is
    /// raised as [`OperationError::Graphql`]; a response with neither data
    /// nor errors is [`ClientError::MissingData`].
    pub fn ok_data(self) -> Result<Data, OperationError> {
        if !self.errors.is_empty() {
            return Err(OperationError::Graphql(self.errors));
        }
        self.data
            .ok_or(OperationError::Client(ClientError::MissingData))
    }
}

impl Response<Value> {
    /// Deserialize the payload into a typed response.
    ///
    /// Errors and extensions pass through untouched; a `null` or absent
    /// payload stays `None`.
    pub fn into_typed<D: DeserializeOwned>(self) -> Result<Response<D>, ClientError> {
        let data = match self.data {
            Some(Value::Null) | None => None,
            Some(value) => Some(
                serde_json::from_value(value).map_err(|e| ClientError::Json(e.to_string()))?,
            ),
        };
        Ok(Response {
            data,
            errors: self.errors,
            extensions: self.extensions,
        })
    }
}
