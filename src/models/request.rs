// GraphQL request model for DevServe
// The JSON body accepted by POST /graphql

//! # Execution Input
//!
//! The wire shape of a GraphQL-over-HTTP request is:
//!
//! ```json
//! { "query": "{ greeting }", "variables": { "id": 1 }, "operationName": "Q" }
//! ```
//!
//! `variables` and `operationName` are optional. A `null` variables object is
//! accepted and treated the same as an empty one.
//!
//! ## Rust Learning Notes:
//!
//! ### Serde Field Renaming
//! GraphQL clients send camelCase keys. `#[serde(rename = "operationName")]`
//! maps the JSON key onto an idiomatic snake_case Rust field.
//!
//! ### Custom Deserialization Helpers
//! `deserialize_with` lets us normalize `null` into an empty map without
//! making every consumer deal with `Option<Map>`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Operation name GraphiQL uses when it loads the schema
pub const INTROSPECTION_OPERATION: &str = "IntrospectionQuery";

/// A single GraphQL operation to execute against the current engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInput {
    /// The operation text
    pub query: String,

    /// Variable values keyed by name; values are opaque JSON
    #[serde(default, deserialize_with = "null_as_empty")]
    pub variables: Map<String, Value>,

    /// Selects one operation when the document contains several
    #[serde(rename = "operationName", default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl ExecutionInput {
    /// Create an input with no variables and no operation name
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Whether this is the schema introspection query sent by GraphiQL
    pub fn is_introspection(&self) -> bool {
        self.operation_name.as_deref() == Some(INTROSPECTION_OPERATION)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
