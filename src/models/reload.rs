// Reload bookkeeping for DevServe

//! # Reload State
//!
//! The reload controller moves through a small state machine:
//!
//! ```text
//! Idle ──reload()──▶ Reloading ──ok──▶ Idle
//!                        │
//!                        └──err──▶ Failed ──▶ Idle
//! ```
//!
//! [`ReloadStatus`] is the snapshot exposed by `GET /status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the reload state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPhase {
    Idle,
    Reloading,
    Failed,
}

impl std::fmt::Display for ReloadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReloadPhase::Idle => "idle",
            ReloadPhase::Reloading => "reloading",
            ReloadPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of reload progress and history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadStatus {
    pub phase: ReloadPhase,
    /// Generation of the engine currently serving requests (0 = none yet)
    pub generation: u64,
    /// Successful reloads, the initial load included
    pub reload_count: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for ReloadStatus {
    fn default() -> Self {
        Self {
            phase: ReloadPhase::Idle,
            generation: 0,
            reload_count: 0,
            last_started_at: None,
            last_success_at: None,
            last_failure_at: None,
            last_error: None,
        }
    }
}

impl ReloadStatus {
    pub(crate) fn begin(&mut self) {
        self.phase = ReloadPhase::Reloading;
        self.last_started_at = Some(Utc::now());
    }

    pub(crate) fn succeed(&mut self, generation: u64) {
        self.phase = ReloadPhase::Idle;
        self.generation = generation;
        self.reload_count += 1;
        self.last_success_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.phase = ReloadPhase::Failed;
        self.last_failure_at = Some(Utc::now());
        self.last_error = Some(error);
    }

    /// Failed is transient: once reported the controller returns to Idle
    pub(crate) fn settle(&mut self) {
        self.phase = ReloadPhase::Idle;
    }
}

/// What a successful reload did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadReport {
    pub provider: String,
    pub generation: u64,
    pub previous_generation: Option<u64>,
    pub duration_ms: u64,
}
