// DevServe Server Layer
// Exposes the current engine over HTTP and wires up reload triggers

//! # DevServe Server Module
//!
//! This module contains the network-facing part of DevServe. It sits on top
//! of the engine layer and never builds engines itself: every request reads
//! the current engine from the [`EngineHandle`](crate::engine::EngineHandle),
//! and reloads go through the [`ReloadController`](crate::engine::ReloadController).
//!
//! ## Server Architecture
//!
//! ```text
//! Browser (GraphiQL) / GraphQL client / kill -HUP
//!        ↓ HTTP                              ↓ signal
//! Server Layer (this module) ← routes, CORS, SignalBridge
//!        ↓ current() / reload()
//! Engine Layer ← EngineHandle, ReloadController
//! ```
//!
//! ## Endpoints
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | Liveness, always `OK` |
//! | `POST /graphql` | Execute against the current engine |
//! | `POST /reload` | Trigger a reload |
//! | `GET /status` | Reload status and current provider |
//! | `GET /graphiql` | GraphiQL IDE |
//! | `GET /js/:file` | GraphiQL plugin scripts |
//! | `GET /` | Redirect to `/graphiql` |
//!
//! ## Rust Learning Notes:
//!
//! This module demonstrates:
//! - Axum routers with shared state
//! - Catching panics in async handlers with `FutureExt::catch_unwind`
//! - Graceful shutdown with a oneshot channel
//! - Compile-time asset bundling with `include_str!`

/// HTTP server: router, handlers and server lifecycle
pub mod graphql;

/// Bundled GraphiQL page and scripts
pub mod assets;

/// SIGHUP and programmatic reload triggers
pub mod signals;

pub use graphql::{
    create_router, parse_request, AppState, DevServeServer, MalformedRequestError, RunningServer, StatusResponse,
};
pub use signals::{
    spawn_reload, ChannelTrigger, NoopTrigger, ReloadSender, ReloadTrigger, SighupTrigger, SignalBridge, TriggerError,
};

#[cfg(test)]
mod graphql_tests;
