// GraphQL response model for DevServe
// The JSON bodies returned by POST /graphql

//! # Execution Results
//!
//! Every response produced by the GraphQL endpoint carries an `errors` array,
//! even when it is empty. GraphiQL and the introspection tooling built on it
//! rely on that key being present, so [`ExecutionResult`] never skips it.
//!
//! Each error is serialized with all four standard keys (`message`,
//! `locations`, `path`, `extensions`); missing values become `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source position of an error inside the operation text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// One step of the response path an error refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// A structured GraphQL error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default)]
    pub locations: Option<Vec<Location>>,
    #[serde(default)]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = Some(locations);
        self
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }

    /// Add one entry to the `extensions` object
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// The result of executing one operation: data payload plus ordered errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

impl ExecutionResult {
    pub fn data(data: Value) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(data: Value, errors: Vec<GraphQLError>) -> Self {
        Self { data, errors }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Error-only body used for 400/500/503 responses from the GraphQL endpoint
///
/// Unlike [`ExecutionResult`] this has no `data` key: the engine never ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub errors: Vec<ErrorEntry>,
}

/// A compact error entry: only the keys that carry a value are emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ErrorBody {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            errors: vec![ErrorEntry {
                message: message.into(),
                extensions: None,
            }],
        }
    }

    /// An error tagged with the failing error kind under `extensions.exception`
    pub fn exception(message: impl Into<String>, kind: impl Into<String>) -> Self {
        let mut extensions = Map::new();
        extensions.insert("exception".to_string(), Value::String(kind.into()));
        Self {
            errors: vec![ErrorEntry {
                message: message.into(),
                extensions: Some(extensions),
            }],
        }
    }
}
