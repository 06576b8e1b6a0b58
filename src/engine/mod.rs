// DevServe Engine Layer
// Provider discovery, the swappable engine slot, and reload orchestration

//! # DevServe Engine Module
//!
//! This module owns everything between the hosting application's GraphQL
//! engine and the HTTP server. The server only ever talks to an
//! [`EngineHandle`]; the [`ReloadController`] is the only writer of that handle.
//!
//! ## Architecture Overview
//!
//! ```text
//! SignalBridge / POST /reload
//!        ↓
//! ReloadController ── discover() ──▶ ProviderRegistry ──▶ DevServeProvider
//!        ↓ swap()                                              ↓ engine()
//! EngineHandle ◀──────────────── new GraphQLEngine ◀───────────┘
//!        ↑ current()
//! POST /graphql
//! ```
//!
//! ## Engine Components
//!
//! ### Collaborator Traits (`traits` module)
//! - [`GraphQLEngine`]: executes operations, optionally releases resources
//! - [`DevServeProvider`]: builds the engine to serve
//!
//! ### Engine Slot (`handle` module)
//! - Lock-free current/swap over `arc-swap`
//!
//! ### Provider Registry (`registry` module)
//! - Explicit candidate table with exactly-one validation
//!
//! ### Reload Controller (`reload` module)
//! - Single-flight reload state machine with drain-then-release retirement
//!
//! ### Schema Adapter (`schema` module)
//! - Serves any `async_graphql::Schema` as a [`GraphQLEngine`]
//!
//! ## Rust Learning Notes:
//!
//! ### Re-exports for API Design
//! The `pub use` statements flatten the module hierarchy, so callers write
//! `devserve::engine::EngineHandle` rather than naming the submodule.

/// Engine and provider capabilities plus their error types
pub mod traits;

/// Hot-swappable engine slot
pub mod handle;

/// Explicit provider registration and discovery
pub mod registry;

/// Reload state machine
pub mod reload;

/// async-graphql schema adapter
pub mod schema;

pub use handle::{EngineHandle, EngineRef, InstalledEngine};
pub use registry::{DiscoveryError, ProviderConstructor, ProviderRegistry, PROVIDER_CAPABILITY};
pub use reload::{ReloadController, ReloadError, DEFAULT_DRAIN_TIMEOUT};
pub use schema::SchemaEngine;
pub use traits::{ConstructionError, DevServeProvider, ExecutionError, GraphQLEngine, ReleaseError};
