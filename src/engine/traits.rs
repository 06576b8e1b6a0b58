// Collaborator contracts for DevServe
// The engine and provider capabilities supplied by the hosting application

//! # Engine and Provider Traits
//!
//! DevServe never executes GraphQL itself. The hosting application supplies:
//!
//! - a [`DevServeProvider`]: the single registered object able to produce an
//!   engine (typically by booting the application's own wiring), and
//! - a [`GraphQLEngine`]: the opaque component that executes operations.
//!
//! ## Rust Learning Notes:
//!
//! ### Async Traits
//! Trait objects with async methods need the `async-trait` crate: the macro
//! rewrites each `async fn` into a method returning a boxed future.
//!
//! ### Trait Bounds
//! `Send + Sync` lets engines be shared between the request tasks of the
//! multi-threaded tokio runtime through `Arc<dyn GraphQLEngine>`.
//!
//! ### Default Methods
//! [`GraphQLEngine::release`] has a default body, so engines that own nothing
//! but memory need not implement it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ExecutionInput, ExecutionResult};

/// Failure raised by an engine while executing an operation
///
/// `kind` plays the role of an exception class name: it is the only detail
/// of the failure that reaches the HTTP client (as `extensions.exception`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    pub kind: String,
    pub message: String,
}

impl ExecutionError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("InternalError", message)
    }
}

/// Failure while building a provider or obtaining an engine from it
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ConstructionError {
    pub message: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl ConstructionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure while releasing a retired engine's resources; only ever logged
#[derive(Error, Debug)]
#[error("Failed to release engine resources: {0}")]
pub struct ReleaseError(pub String);

/// The opaque GraphQL-executing component
#[async_trait]
pub trait GraphQLEngine: Send + Sync {
    /// Execute one operation
    ///
    /// GraphQL-level problems (validation, resolver errors) belong in
    /// `ExecutionResult::errors`. An `Err` means the engine itself failed.
    async fn execute(&self, input: ExecutionInput) -> Result<ExecutionResult, ExecutionError>;

    /// Release owned resources (connections, worker pools, ...)
    ///
    /// Called once, after the engine has been swapped out and no in-flight
    /// request holds it any more.
    async fn release(&self) -> Result<(), ReleaseError> {
        Ok(())
    }
}

/// Produces the engine DevServe should serve
///
/// A fresh provider is constructed on every discovery pass, so construction
/// may perform expensive setup (starting a container, reading schema files).
#[async_trait]
pub trait DevServeProvider: Send + Sync {
    async fn engine(&self) -> Result<Arc<dyn GraphQLEngine>, ConstructionError>;
}
