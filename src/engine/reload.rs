// Hot-reload orchestration for DevServe
// Discovers a provider, builds a new engine, swaps it in, retires the old one

//! # Reload Controller
//!
//! A reload replaces the engine that serves requests without restarting the
//! listener. The sequence is:
//!
//! 1. Discover the provider (a full pass over the registry)
//! 2. Ask the provider for a new engine
//! 3. Swap it into the [`EngineHandle`]
//! 4. Retire the previous engine: wait for in-flight requests still holding
//!    it, then release its resources
//!
//! If step 1 or 2 fails, the handle is never touched and the previous engine
//! keeps serving. Release failures in step 4 are logged and never fail the
//! reload.
//!
//! ## Single-Flight
//!
//! Only one reload runs at a time. A caller that arrives while a reload is in
//! progress is rejected immediately with [`ReloadError::AlreadyInProgress`];
//! it does not wait. Triggers (SIGHUP, `POST /reload`) report the rejection
//! and the in-progress reload already picks up the latest code.
//!
//! ## Rust Learning Notes:
//!
//! ### `try_lock` for Non-Blocking Exclusion
//! `tokio::sync::Mutex::try_lock` returns immediately with an error when the
//! lock is held, which is exactly the reject-don't-wait policy we want.
//!
//! ### Reference Counts as Drain Signal
//! Every in-flight request owns a clone of the engine's `Arc`. Once the
//! handle has let go, `Arc::strong_count == 1` means the controller holds the
//! last reference and nobody can be using the engine any more.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::handle::{EngineHandle, EngineRef, InstalledEngine};
use super::registry::{DiscoveryError, ProviderRegistry};
use super::traits::ConstructionError;
use crate::models::{ProviderContext, ReloadReport, ReloadStatus};

/// How often retirement checks whether in-flight requests have finished
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default bound on how long a reload waits for the old engine to drain
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors returned by [`ReloadController::reload`]
#[derive(Error, Debug)]
pub enum ReloadError {
    #[error("Reload already in progress")]
    AlreadyInProgress,

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Provider {provider} failed to create an engine: {source}")]
    Construction {
        provider: String,
        #[source]
        source: ConstructionError,
    },
}

/// Orchestrates discovery, engine construction and engine swap
pub struct ReloadController {
    registry: ProviderRegistry,
    handle: Arc<EngineHandle>,
    classpath: Vec<PathBuf>,
    drain_timeout: Duration,
    guard: Mutex<()>,
    status: RwLock<ReloadStatus>,
    next_generation: AtomicU64,
}

impl ReloadController {
    pub fn new(registry: ProviderRegistry, handle: Arc<EngineHandle>) -> Self {
        Self {
            registry,
            handle,
            classpath: Vec::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            guard: Mutex::new(()),
            status: RwLock::new(ReloadStatus::default()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Module set handed to providers on every pass
    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn handle(&self) -> &Arc<EngineHandle> {
        &self.handle
    }

    pub async fn status(&self) -> ReloadStatus {
        self.status.read().await.clone()
    }

    /// Load the first engine at startup
    ///
    /// Same steps as [`reload`](Self::reload); the caller is expected to treat
    /// an error as fatal since there is no previous engine to fall back on.
    pub async fn initial_load(&self) -> Result<ReloadReport, ReloadError> {
        info!("🚀 Loading initial engine...");
        self.reload().await
    }

    /// Replace the current engine with a freshly discovered one
    pub async fn reload(&self) -> Result<ReloadReport, ReloadError> {
        let _flight = match self.guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Reload requested while another reload is in progress; rejecting");
                return Err(ReloadError::AlreadyInProgress);
            }
        };

        let reload_id = Uuid::new_v4();
        let started = Instant::now();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        self.status.write().await.begin();
        info!(%reload_id, generation, "🔄 Reloading engine...");

        let installed = match self.build_engine(generation).await {
            Ok(installed) => installed,
            Err(e) => {
                error!(%reload_id, "❌ Reload failed, keeping previous engine: {}", e);
                let mut status = self.status.write().await;
                status.fail(e.to_string());
                status.settle();
                return Err(e);
            }
        };

        let provider = installed.provider().to_string();
        let previous = self.handle.swap(installed);
        let previous_generation = previous.as_ref().map(|p| p.generation());
        info!(%reload_id, generation, ?previous_generation, "✅ Engine from {} installed", provider);

        if let Some(old) = previous {
            self.retire(old).await;
        }

        self.status.write().await.succeed(generation);

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(%reload_id, duration_ms, "Reload completed");

        Ok(ReloadReport {
            provider,
            generation,
            previous_generation,
            duration_ms,
        })
    }

    async fn build_engine(&self, generation: u64) -> Result<InstalledEngine, ReloadError> {
        let ctx = ProviderContext::new(self.classpath.clone(), generation);

        let (name, provider) = self.registry.discover(&ctx)?;

        debug!("Getting engine instance from provider {}", name);
        let engine = provider.engine().await.map_err(|source| ReloadError::Construction {
            provider: name.clone(),
            source,
        })?;

        Ok(InstalledEngine::new(engine, name, generation))
    }

    /// Wait for in-flight requests on `old` to finish, then release it
    ///
    /// If draining exceeds the configured timeout, retirement continues on a
    /// background task so the reload itself can complete.
    async fn retire(&self, old: EngineRef) {
        let deadline = tokio::time::Instant::now() + self.drain_timeout;
        while Arc::strong_count(&old) > 1 {
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    generation = old.generation(),
                    holders = Arc::strong_count(&old) - 1,
                    "Old engine still in use after drain timeout; releasing in background"
                );
                tokio::spawn(async move {
                    while Arc::strong_count(&old) > 1 {
                        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
                    }
                    release_engine(old).await;
                });
                return;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
        release_engine(old).await;
    }

    /// Take the engine out of service and release it
    pub async fn shutdown(&self) {
        let _flight = self.guard.lock().await;
        if let Some(engine) = self.handle.take() {
            info!("🛑 Releasing engine generation {}", engine.generation());
            self.retire(engine).await;
        }
    }
}

async fn release_engine(engine: EngineRef) {
    let generation = engine.generation();
    match engine.engine().release().await {
        Ok(()) => debug!(generation, "Released engine from {}", engine.provider()),
        Err(e) => warn!(generation, "Error releasing previous engine: {}", e),
    }
}

impl std::fmt::Debug for ReloadController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadController")
            .field("registry", &self.registry)
            .field("handle", &self.handle)
            .field("classpath", &self.classpath)
            .field("drain_timeout", &self.drain_timeout)
            .finish()
    }
}
