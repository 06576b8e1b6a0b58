// Core data models for DevServe
// Plain value types shared by the engine and server layers

//! # Data Models Module
//!
//! This module contains the value types that flow through DevServe. None of
//! them hold resources or locks; they are created per request, per discovery
//! pass, or per reload and then dropped.
//!
//! ## Rust Learning Notes:
//!
//! ### Module Organization
//! This `mod.rs` file serves as the **module root** for the `models` directory.
//! Each `pub mod` declaration pulls in a sibling `.rs` file as a submodule.
//!
//! ### Re-exports for Clean APIs
//! The `pub use` statements at the bottom create a flat API, so users write
//! `devserve::models::ExecutionInput` instead of
//! `devserve::models::request::ExecutionInput`.

// Contains ExecutionInput - the body of POST /graphql
pub mod request;

// Contains ExecutionResult and GraphQLError - what the engine returns
pub mod response;

// Contains ProviderDescriptor and ProviderContext - discovery records
pub mod provider;

// Contains ReloadPhase and ReloadStatus - reload state machine bookkeeping
pub mod reload;

pub use provider::{ProviderContext, ProviderDescriptor};
pub use reload::{ReloadPhase, ReloadReport, ReloadStatus};
pub use request::{ExecutionInput, INTROSPECTION_OPERATION};
pub use response::{ErrorBody, ErrorEntry, ExecutionResult, GraphQLError, Location, PathSegment};
