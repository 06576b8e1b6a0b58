// DevServe - Development Server Binary
// Hosts a demo GraphQL engine with hot-reload
// Run with: cargo run --bin devserve -- --port 0

//! # DevServe Server Binary
//!
//! This executable starts DevServe with a small demo provider so the whole
//! loop can be tried without an application: open GraphiQL, run
//! `{ greeting generation }`, then `kill -HUP <pid>` (or `POST /reload`) and
//! watch `generation` go up.
//!
//! ## Architecture Demonstration
//! ```text
//! main()
//!   ↓ parses           ↓ loads
//! Cli (clap)         DevServeConfig (config + dotenv)
//!   ↓ builds
//! DevServeServer ── ProviderRegistry ── DemoProvider
//!   ↓ serves                                ↓ builds
//! HTTP (Axum)  ◀── EngineHandle ◀── SchemaEngine (async-graphql)
//! ```
//!
//! Applications embedding DevServe do the same thing with their own provider
//! registered in place of `DemoProvider`.
//!
//! ## Rust Learning Notes:
//!
//! This file demonstrates:
//! - Binary crate vs library crate organization
//! - Command-line parsing with `clap` derive, falling back to environment variables
//! - `anyhow::Result` in `main` for fatal startup errors

use std::sync::Arc;

use anyhow::Context as _;
use async_graphql::{EmptyMutation, EmptySubscription, Object, Schema};
use async_trait::async_trait;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use devserve::{
    ConstructionError, DevServeConfig, DevServeProvider, DevServeServer, GraphQLEngine, ProviderRegistry,
    SchemaEngine, SignalBridge,
};

/// Hot-reloading GraphQL development server
#[derive(Parser, Debug)]
#[command(name = "devserve", version, about)]
struct Cli {
    /// Interface to listen on (IP address or hostname)
    #[arg(long, env = "DEVSERVE_HOST")]
    host: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "DEVSERVE_PORT")]
    port: Option<u16>,

    /// Module set handed to the provider, as a path list
    #[arg(long, env = "DEVSERVE_CLASSPATH")]
    classpath: Option<String>,

    /// How long a reload waits for in-flight requests, in milliseconds
    #[arg(long, env = "DEVSERVE_DRAIN_TIMEOUT_MS")]
    drain_timeout_ms: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply(self, mut config: DevServeConfig) -> DevServeConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.classpath.is_some() {
            config.classpath = self.classpath;
        }
        if let Some(timeout) = self.drain_timeout_ms {
            config.drain_timeout_ms = timeout;
        }
        config
    }
}

struct DemoQuery {
    generation: u64,
}

#[Object]
impl DemoQuery {
    /// A fixed greeting
    async fn greeting(&self) -> &str {
        "Hello from DevServe"
    }

    /// Which reload produced the engine answering this query
    async fn generation(&self) -> u64 {
        self.generation
    }
}

/// Builds a fresh demo schema on every reload
struct DemoProvider {
    generation: u64,
}

#[async_trait]
impl DevServeProvider for DemoProvider {
    async fn engine(&self) -> Result<Arc<dyn GraphQLEngine>, ConstructionError> {
        let schema = Schema::new(
            DemoQuery {
                generation: self.generation,
            },
            EmptyMutation,
            EmptySubscription,
        );
        Ok(Arc::new(SchemaEngine::new(schema)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.apply(DevServeConfig::load().context("Failed to load configuration")?);
    info!("Server: {}:{}", config.host, config.port);

    let mut registry = ProviderRegistry::new();
    registry.register_fn("devserve::demo::DemoProvider", |ctx| {
        Ok(Box::new(DemoProvider {
            generation: ctx.generation,
        }) as Box<dyn DevServeProvider>)
    });

    DevServeServer::new(config, registry)
        .with_trigger(SignalBridge::platform_default())
        .run()
        .await
        .context("DevServe failed")?;

    Ok(())
}
