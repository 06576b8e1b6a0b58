// async-graphql adapter for DevServe
// Lets any async_graphql::Schema be served as a GraphQLEngine

//! # Schema Engine
//!
//! [`SchemaEngine`] wraps an `async_graphql::Schema` and translates between
//! DevServe's wire models and async-graphql's request/response types.
//!
//! ## Rust Learning Notes:
//!
//! ### Generic Trait Implementations
//! `impl<Q, M, S> GraphQLEngine for SchemaEngine<Q, M, S>` implements the trait
//! once for every combination of query, mutation and subscription roots, as
//! long as they satisfy async-graphql's own bounds.

use async_graphql::{ObjectType, Request, Schema, ServerError, SubscriptionType, Variables};
use async_trait::async_trait;
use serde_json::Value;

use super::traits::{ExecutionError, GraphQLEngine};
use crate::models::{ExecutionInput, ExecutionResult, GraphQLError, Location, PathSegment};

/// A [`GraphQLEngine`] backed by an async-graphql schema
pub struct SchemaEngine<Q, M, S> {
    schema: Schema<Q, M, S>,
}

impl<Q, M, S> SchemaEngine<Q, M, S>
where
    Q: ObjectType + 'static,
    M: ObjectType + 'static,
    S: SubscriptionType + 'static,
{
    pub fn new(schema: Schema<Q, M, S>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema<Q, M, S> {
        &self.schema
    }

    /// Schema definition language of the wrapped schema
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }
}

#[async_trait]
impl<Q, M, S> GraphQLEngine for SchemaEngine<Q, M, S>
where
    Q: ObjectType + 'static,
    M: ObjectType + 'static,
    S: SubscriptionType + 'static,
{
    async fn execute(&self, input: ExecutionInput) -> Result<ExecutionResult, ExecutionError> {
        let mut request = Request::new(input.query).variables(Variables::from_json(Value::Object(input.variables)));
        if let Some(name) = input.operation_name {
            request = request.operation_name(name);
        }

        let response = self.schema.execute(request).await;

        let data = serde_json::to_value(&response.data)
            .map_err(|e| ExecutionError::new("SerializationError", e.to_string()))?;
        let errors = response.errors.into_iter().map(convert_error).collect();

        Ok(ExecutionResult::with_errors(data, errors))
    }
}

fn convert_error(error: ServerError) -> GraphQLError {
    let mut converted = GraphQLError::new(error.message);

    if !error.locations.is_empty() {
        converted = converted.with_locations(
            error
                .locations
                .iter()
                .map(|pos| Location {
                    line: pos.line,
                    column: pos.column,
                })
                .collect(),
        );
    }

    if !error.path.is_empty() {
        converted = converted.with_path(
            error
                .path
                .into_iter()
                .map(|segment| match segment {
                    async_graphql::PathSegment::Field(name) => PathSegment::Field(name),
                    async_graphql::PathSegment::Index(index) => PathSegment::Index(index),
                })
                .collect(),
        );
    }

    if let Some(Value::Object(extensions)) = error.extensions.as_ref().and_then(|ext| serde_json::to_value(ext).ok()) {
        converted.extensions = Some(extensions);
    }

    converted
}
