//! Hot-swappable slot holding the engine that serves requests.
//!
//! Readers load the current `Arc` without taking a lock, so a reload never
//! stalls request handling. A request keeps the `Arc` it loaded until it
//! finishes; swapping the slot only affects requests that start afterwards.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};

use super::traits::GraphQLEngine;

/// An engine together with where it came from
pub struct InstalledEngine {
    engine: Arc<dyn GraphQLEngine>,
    provider: String,
    generation: u64,
    installed_at: DateTime<Utc>,
}

impl InstalledEngine {
    pub fn new(engine: Arc<dyn GraphQLEngine>, provider: impl Into<String>, generation: u64) -> Self {
        Self {
            engine,
            provider: provider.into(),
            generation,
            installed_at: Utc::now(),
        }
    }

    pub fn engine(&self) -> &Arc<dyn GraphQLEngine> {
        &self.engine
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn installed_at(&self) -> DateTime<Utc> {
        self.installed_at
    }
}

impl std::fmt::Debug for InstalledEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstalledEngine")
            .field("provider", &self.provider)
            .field("generation", &self.generation)
            .field("installed_at", &self.installed_at)
            .finish()
    }
}

/// Shared reference to an installed engine
pub type EngineRef = Arc<InstalledEngine>;

/// Thread-safe holder of the current engine
#[derive(Default)]
pub struct EngineHandle {
    slot: ArcSwapOption<InstalledEngine>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::new(None),
        }
    }

    /// The latest installed engine, `None` only before the first install
    pub fn current(&self) -> Option<EngineRef> {
        self.slot.load_full()
    }

    /// Install `engine` and hand back the one it replaced
    pub fn swap(&self, engine: InstalledEngine) -> Option<EngineRef> {
        self.slot.swap(Some(Arc::new(engine)))
    }

    /// Empty the slot; used at shutdown only
    pub fn take(&self) -> Option<EngineRef> {
        self.slot.swap(None)
    }

    pub fn is_installed(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Generation of the current engine, 0 before the first install
    pub fn generation(&self) -> u64 {
        self.current().map(|e| e.generation()).unwrap_or(0)
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("current", &self.slot.load_full())
            .finish()
    }
}
