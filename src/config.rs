// DevServe configuration
// Read once at startup: defaults, then devserve.toml, then DEVSERVE_* variables

//! # Configuration
//!
//! Settings are layered with the `config` crate. Later sources override
//! earlier ones:
//!
//! 1. Built-in defaults (`0.0.0.0:8080`, 5s drain timeout, CORS on)
//! 2. An optional `devserve.toml` (or `.yaml`/`.json`) in the working directory
//! 3. Environment variables prefixed with `DEVSERVE_`, e.g. `DEVSERVE_PORT=0`
//!
//! The binary additionally lets command-line flags override the result.
//!
//! ## Rust Learning Notes:
//!
//! ### Layered Configuration
//! `config::Config::builder()` collects sources and `try_deserialize` turns
//! the merged result into our strongly-typed struct via serde. Environment
//! variables arrive as strings; the `config` crate converts them to numbers
//! and booleans as the target fields require.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{DevServeError, Result};

/// Process configuration for the development server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevServeConfig {
    /// Interface to listen on
    pub host: String,
    /// Port to listen on; 0 picks an ephemeral port
    pub port: u16,
    /// Module set handed to providers, as a platform path list
    #[serde(default)]
    pub classpath: Option<String>,
    /// How long a reload waits for in-flight requests on the old engine
    pub drain_timeout_ms: u64,
    pub cors_enabled: bool,
}

impl Default for DevServeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            classpath: None,
            drain_timeout_ms: 5000,
            cors_enabled: true,
        }
    }
}

impl DevServeConfig {
    /// A builder pre-populated with the defaults
    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        let defaults = Self::default();
        Ok(Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("drain_timeout_ms", defaults.drain_timeout_ms as i64)?
            .set_default("cors_enabled", defaults.cors_enabled)?)
    }

    /// Load defaults, `devserve.*` file and `DEVSERVE_*` environment variables
    pub fn load() -> Result<Self> {
        let config = Self::builder()?
            .add_source(File::with_name("devserve").required(false))
            .add_source(Environment::with_prefix("DEVSERVE"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Classpath entries, empty entries dropped
    pub fn classpath_entries(&self) -> Vec<PathBuf> {
        self.classpath
            .as_deref()
            .map(|raw| std::env::split_paths(raw).filter(|p| !p.as_os_str().is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Socket address to bind
    ///
    /// `host` may be an IP literal (v4 or v6) or a hostname; hostnames resolve
    /// to their first address.
    pub async fn bind_addr(&self) -> Result<SocketAddr> {
        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| DevServeError::InvalidInput(format!("Invalid listen host {}: {}", self.host, e)))?;
        addrs
            .next()
            .ok_or_else(|| DevServeError::InvalidInput(format!("Listen host {} resolved to no address", self.host)))
    }
}
