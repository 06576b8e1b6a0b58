// External reload triggers for DevServe
// Routes OS signals and programmatic requests to ReloadController::reload

//! # Signal Bridge
//!
//! A reload can be requested from outside the HTTP surface. Each source is a
//! [`ReloadTrigger`]:
//!
//! - [`SighupTrigger`]: `kill -HUP <pid>` (unix only)
//! - [`ChannelTrigger`]: an in-process sender, for build tools embedding DevServe
//! - [`NoopTrigger`]: fallback where signals are unsupported
//!
//! Every trigger hands the actual reload to a freshly spawned task; the
//! listening task only waits for the next notification. Reload outcomes
//! (including single-flight rejections) are logged.
//!
//! ## Rust Learning Notes:
//!
//! ### Conditional Compilation
//! `#[cfg(unix)]` compiles [`SighupTrigger`]'s signal code only on unix
//! targets; elsewhere the same type reports that it is unsupported.
//!
//! ### Trait Objects with `Box<Self>`
//! `install(self: Box<Self>, ..)` lets a trigger consume itself even when it is
//! held as `Box<dyn ReloadTrigger>`.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::engine::{ReloadController, ReloadError};

/// Failure to subscribe to a reload source
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Reload trigger {0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("Failed to register reload trigger {name}: {source}")]
    Registration {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// A source of reload notifications
pub trait ReloadTrigger: Send {
    fn name(&self) -> &'static str;

    /// Start listening; each notification reloads through `controller`
    fn install(self: Box<Self>, controller: Arc<ReloadController>) -> Result<JoinHandle<()>, TriggerError>;
}

/// Run one reload on its own task and log the outcome
pub fn spawn_reload(controller: Arc<ReloadController>, source: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        match controller.reload().await {
            Ok(report) => info!(
                "🔥 Hot-reload via {} completed: generation {} from {}",
                source, report.generation, report.provider
            ),
            Err(ReloadError::AlreadyInProgress) => {
                warn!("Hot-reload via {} skipped: reload already in progress", source)
            }
            Err(e) => error!("Hot-reload via {} failed: {}", source, e),
        }
    })
}

/// Reload on SIGHUP
#[derive(Debug, Default, Clone, Copy)]
pub struct SighupTrigger;

impl ReloadTrigger for SighupTrigger {
    fn name(&self) -> &'static str {
        "SIGHUP"
    }

    #[cfg(unix)]
    fn install(self: Box<Self>, controller: Arc<ReloadController>) -> Result<JoinHandle<()>, TriggerError> {
        use tokio::signal::unix::{signal, SignalKind};

        let name = self.name();
        let mut stream =
            signal(SignalKind::hangup()).map_err(|source| TriggerError::Registration { name, source })?;

        Ok(tokio::spawn(async move {
            while stream.recv().await.is_some() {
                info!("Received SIGHUP signal, reloading...");
                spawn_reload(controller.clone(), name);
            }
        }))
    }

    #[cfg(not(unix))]
    fn install(self: Box<Self>, _controller: Arc<ReloadController>) -> Result<JoinHandle<()>, TriggerError> {
        Err(TriggerError::Unsupported(self.name()))
    }
}

/// Trigger that never fires
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrigger;

impl ReloadTrigger for NoopTrigger {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn install(self: Box<Self>, _controller: Arc<ReloadController>) -> Result<JoinHandle<()>, TriggerError> {
        Ok(tokio::spawn(async {}))
    }
}

/// Sending half of a [`ChannelTrigger`]
#[derive(Debug, Clone)]
pub struct ReloadSender {
    tx: mpsc::UnboundedSender<()>,
}

impl ReloadSender {
    /// Queue a reload; returns false once the trigger has stopped listening
    pub fn request(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// Programmatic trigger driven by a [`ReloadSender`]
#[derive(Debug)]
pub struct ChannelTrigger {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ChannelTrigger {
    pub fn new() -> (Self, ReloadSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ReloadSender { tx })
    }
}

impl ReloadTrigger for ChannelTrigger {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn install(self: Box<Self>, controller: Arc<ReloadController>) -> Result<JoinHandle<()>, TriggerError> {
        let name = self.name();
        let mut rx = self.rx;
        Ok(tokio::spawn(async move {
            while rx.recv().await.is_some() {
                spawn_reload(controller.clone(), name);
            }
        }))
    }
}

/// Installs reload triggers without ever failing the process
pub struct SignalBridge;

impl SignalBridge {
    /// Install `trigger`; a registration failure is logged as a warning
    pub fn install(trigger: Box<dyn ReloadTrigger>, controller: Arc<ReloadController>) -> Option<JoinHandle<()>> {
        let name = trigger.name();
        match trigger.install(controller) {
            Ok(handle) => {
                info!("{} handler registered for hot-reload", name);
                Some(handle)
            }
            Err(e) => {
                warn!("Could not register {} handler (may not be supported on this platform): {}", name, e);
                None
            }
        }
    }

    /// The platform's default trigger: SIGHUP on unix, nothing elsewhere
    pub fn platform_default() -> Box<dyn ReloadTrigger> {
        if cfg!(unix) {
            Box::new(SighupTrigger)
        } else {
            Box::new(NoopTrigger)
        }
    }
}
