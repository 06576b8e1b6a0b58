// DevServe - Rust Edition
// A hot-reloading development server for GraphQL engines

//! # DevServe Library
//!
//! DevServe hosts an application's GraphQL engine behind a small HTTP server
//! and swaps that engine for a freshly built one on demand, without dropping
//! the listener or failing in-flight requests. This file is the **library
//! root** and defines the public API.
//!
//! ## Core Components
//!
//! ### Collaborators
//! - [`GraphQLEngine`]: the application's executor; DevServe never looks inside it
//! - [`DevServeProvider`]: knows how to build the application's engine
//!
//! ### Engine Layer
//! - [`ProviderRegistry`]: explicit registration, exactly-one discovery
//! - [`EngineHandle`]: the hot-swappable slot requests read from
//! - [`ReloadController`]: single-flight reload with drain-then-release
//!
//! ### Server Layer
//! - [`DevServeServer`]: startup, HTTP routes, graceful shutdown
//! - [`SignalBridge`]: SIGHUP (and programmatic) reload triggers
//!
//! **Usage Example:**
//! ```rust,no_run
//! use devserve::{DevServeConfig, DevServeServer, ProviderRegistry, SignalBridge};
//! # use devserve::{ConstructionError, DevServeProvider, GraphQLEngine};
//! # use std::sync::Arc;
//! # #[derive(Default)]
//! # struct MyProvider;
//! # #[async_trait::async_trait]
//! # impl DevServeProvider for MyProvider {
//! #     async fn engine(&self) -> Result<Arc<dyn GraphQLEngine>, ConstructionError> {
//! #         Err(ConstructionError::new("not built"))
//! #     }
//! # }
//!
//! # async fn run() -> devserve::Result<()> {
//! let mut registry = ProviderRegistry::new();
//! registry.register::<MyProvider>();
//!
//! DevServeServer::new(DevServeConfig::load()?, registry)
//!     .with_trigger(SignalBridge::platform_default())
//!     .run()
//!     .await
//! # }
//! ```
//!
//! ## Rust Learning Notes:
//!
//! ### Module System
//! Each `mod` declaration tells Rust to include code from either a `.rs` file
//! or a directory with a `mod.rs` file.
//!
//! ### Re-exports
//! `pub use` statements create shortcuts so users don't need to know the
//! internal module structure. Instead of `use devserve::engine::reload::ReloadController`,
//! users can write `use devserve::ReloadController`.

// Process configuration (defaults, devserve.toml, DEVSERVE_* variables)
pub mod config;

// Value types shared by the engine and server layers
pub mod models;

// Provider discovery, engine slot and reload orchestration
pub mod engine;

// HTTP server and reload triggers
pub mod server;

pub use config::DevServeConfig;

pub use models::{
    ErrorBody,          // Error-only response body
    ExecutionInput,     // Body of POST /graphql
    ExecutionResult,    // What an engine returns
    GraphQLError,       // One entry of ExecutionResult::errors
    ProviderContext,    // Handed to provider constructors
    ProviderDescriptor, // Discovery record for one candidate
    ReloadPhase,        // Idle / Reloading / Failed
    ReloadReport,       // Outcome of a successful reload
    ReloadStatus,       // Reload history snapshot
};

pub use engine::{
    ConstructionError, DevServeProvider, DiscoveryError, EngineHandle, EngineRef, ExecutionError, GraphQLEngine,
    InstalledEngine, ProviderRegistry, ReleaseError, ReloadController, ReloadError, SchemaEngine,
};

pub use server::{create_router, DevServeServer, RunningServer, SignalBridge};

// Core error types
// Using the `thiserror` crate to make error handling easier
use thiserror::Error;

/// Errors surfaced by DevServe's startup and lifecycle operations
///
/// Request-level failures never show up here: the HTTP layer turns them into
/// status codes. These are the failures that stop the server from starting
/// or shutting down cleanly.
///
/// ## Rust Learning Notes:
///
/// ### The `thiserror` Crate
/// - `#[derive(Error)]` implements the `std::error::Error` trait
/// - `#[error("...")]` provides human-readable error messages
/// - `#[from]` enables automatic conversion, so `?` works across layers
#[derive(Error, Debug)]
pub enum DevServeError {
    /// No usable provider, or the engine could not be built
    #[error("Failed to load engine: {0}")]
    Reload(#[from] ReloadError),

    /// Configuration sources could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// The listen address could not be bound
    #[error("Failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },

    /// The HTTP server stopped with an error
    #[error("Server error: {0}")]
    Server(String),

    /// Error when invalid input is provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Type alias for Results that use our custom error type
pub type Result<T> = std::result::Result<T, DevServeError>;
