// DevServe HTTP server
// Serves the current engine over GraphQL-over-HTTP plus the GraphiQL IDE

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router, Server,
};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use super::assets;
use super::signals::{ReloadTrigger, SignalBridge};
use crate::config::DevServeConfig;
use crate::engine::{EngineHandle, ProviderRegistry, ReloadController, ReloadError};
use crate::models::{ErrorBody, ExecutionInput, ReloadStatus};
use crate::{DevServeError, Result};

/// Error kind reported for request bodies that are not a GraphQL request
pub const MALFORMED_REQUEST: &str = "MalformedRequest";

/// Error kind reported when an engine panics while executing
pub const ENGINE_PANIC: &str = "Panic";

/// A `POST /graphql` body that is not valid JSON or lacks `query`
#[derive(Error, Debug)]
#[error("Malformed GraphQL request: {0}")]
pub struct MalformedRequestError(#[from] serde_json::Error);

impl IntoResponse for MalformedRequestError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::exception(self.to_string(), MALFORMED_REQUEST)),
        )
            .into_response()
    }
}

/// Parse a request body without touching any engine
pub fn parse_request(body: &[u8]) -> std::result::Result<ExecutionInput, MalformedRequestError> {
    Ok(serde_json::from_slice(body)?)
}

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ReloadController>,
}

impl AppState {
    fn handle(&self) -> &Arc<EngineHandle> {
        self.controller.handle()
    }
}

/// Body of `GET /status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub provider: Option<String>,
    pub installed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub reload: ReloadStatus,
}

/// Build the DevServe router around `controller`
pub fn create_router(controller: Arc<ReloadController>, cors_enabled: bool) -> Router {
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/graphql", post(graphql_handler))
        .route("/reload", post(reload_handler))
        .route("/status", get(status_handler))
        .route("/graphiql", get(graphiql))
        .route("/js", get(missing_asset))
        .route("/js/", get(missing_asset))
        .route("/js/:file", get(js_asset))
        .with_state(AppState { controller })
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
    } else {
        app
    }
}

// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// GraphQL handler
async fn graphql_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let input = match parse_request(&body) {
        Ok(input) => input,
        Err(e) => {
            debug!("Rejecting request: {}", e);
            return e.into_response();
        }
    };

    // Held for the whole execution so a concurrent reload drains before releasing it
    let Some(engine) = state.handle().current() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::message("Engine not initialized")),
        )
            .into_response();
    };

    if input.is_introspection() {
        info!("Received schema introspection query from GraphiQL");
    } else {
        debug!(generation = engine.generation(), "Executing GraphQL query: {}", input.query);
    }

    match AssertUnwindSafe(engine.engine().execute(input)).catch_unwind().await {
        Ok(Ok(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(Err(e)) => {
            error!(kind = %e.kind, generation = engine.generation(), "Error executing GraphQL query: {}", e.message);
            let message = if e.message.is_empty() {
                "Internal server error".to_string()
            } else {
                e.message
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::exception(message, e.kind)),
            )
                .into_response()
        }
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            error!(generation = engine.generation(), "Engine panicked executing GraphQL query: {}", detail);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::exception("Internal server error", ENGINE_PANIC)),
            )
                .into_response()
        }
    }
}

// Reload endpoint (alternative to SIGHUP)
async fn reload_handler(State(state): State<AppState>) -> Response {
    info!("Reload requested via HTTP");
    match state.controller.reload().await {
        Ok(_) => (StatusCode::OK, "Reloaded successfully").into_response(),
        Err(ReloadError::AlreadyInProgress) => (StatusCode::CONFLICT, "Reload already in progress").into_response(),
        Err(e) => {
            error!("Reload failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Reload failed: {}", e)).into_response()
        }
    }
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let current = state.handle().current();
    Json(StatusResponse {
        provider: current.as_ref().map(|e| e.provider().to_string()),
        installed_at: current.as_ref().map(|e| e.installed_at()),
        reload: state.controller.status().await,
    })
}

// GraphiQL IDE
async fn graphiql() -> Html<&'static str> {
    Html(assets::GRAPHIQL_HTML)
}

// Root forwards to GraphiQL
async fn root() -> Html<&'static str> {
    Html(assets::ROOT_REDIRECT_HTML)
}

// GraphiQL plugin scripts
async fn js_asset(Path(file): Path<String>) -> Response {
    match assets::script(&file) {
        Some(content) => ([(header::CONTENT_TYPE, assets::content_type(&file))], content).into_response(),
        None => {
            warn!("Static resource not found: /js/{}", file);
            (StatusCode::NOT_FOUND, format!("File not found: {}", file)).into_response()
        }
    }
}

async fn missing_asset() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "File parameter missing")
}

/// Development server: discovery, initial load, HTTP listener, reload triggers
pub struct DevServeServer {
    config: DevServeConfig,
    registry: ProviderRegistry,
    triggers: Vec<Box<dyn ReloadTrigger>>,
}

impl DevServeServer {
    pub fn new(config: DevServeConfig, registry: ProviderRegistry) -> Self {
        Self {
            config,
            registry,
            triggers: Vec::new(),
        }
    }

    /// Add an external reload trigger, e.g. `SignalBridge::platform_default()`
    pub fn with_trigger(mut self, trigger: Box<dyn ReloadTrigger>) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Load the first engine, then bind and start serving in the background
    ///
    /// Fails without binding if no engine could be loaded.
    pub async fn start(self) -> Result<RunningServer> {
        info!("🚀 Starting DevServe...");

        let controller = Arc::new(
            ReloadController::new(self.registry, Arc::new(EngineHandle::new()))
                .with_classpath(self.config.classpath_entries())
                .with_drain_timeout(self.config.drain_timeout()),
        );

        let report = controller.initial_load().await?;
        info!("✅ Engine from {} ready", report.provider);

        let addr = self.config.bind_addr().await?;
        let app = create_router(controller.clone(), self.config.cors_enabled);
        let builder = Server::try_bind(&addr).map_err(|e| DevServeError::Bind {
            addr: addr.to_string(),
            message: e.to_string(),
        })?;
        let server = builder.serve(app.into_make_service());
        let local_addr = server.local_addr();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let graceful = server.with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        });
        let server_task = tokio::spawn(async move { graceful.await.map_err(|e| e.to_string()) });

        if self.config.port == 0 {
            info!("📡 DevServe running on dynamically assigned port: {}", local_addr.port());
        } else {
            info!("📡 DevServe running on port: {}", local_addr.port());
        }
        info!("🔗 Server address: http://{}", local_addr);
        info!("📊 GraphiQL IDE: http://{}/graphiql", local_addr);

        let mut trigger_tasks = Vec::new();
        for trigger in self.triggers {
            if let Some(task) = SignalBridge::install(trigger, controller.clone()) {
                trigger_tasks.push(task);
            }
        }
        info!(
            "🔥 Hot-reload enabled: POST /reload or send SIGHUP (kill -HUP {})",
            std::process::id()
        );

        Ok(RunningServer {
            local_addr,
            shutdown_timeout: self.config.drain_timeout(),
            controller,
            shutdown_tx,
            server_task,
            trigger_tasks,
        })
    }

    /// Serve until Ctrl-C (or SIGTERM), then shut down cleanly
    pub async fn run(self) -> Result<()> {
        let running = self.start().await?;
        shutdown_signal().await;
        info!("🛑 Shutting down DevServe...");
        running.shutdown().await
    }
}

/// A started server
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown_timeout: Duration,
    controller: Arc<ReloadController>,
    shutdown_tx: oneshot::Sender<()>,
    server_task: JoinHandle<std::result::Result<(), String>>,
    trigger_tasks: Vec<JoinHandle<()>>,
}

impl RunningServer {
    /// The address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn controller(&self) -> &Arc<ReloadController> {
        &self.controller
    }

    /// Stop accepting connections, finish in-flight requests, release the engine
    ///
    /// In-flight requests get the drain timeout to finish; after that the
    /// server stops waiting for them and the engine is released once they end.
    pub async fn shutdown(self) -> Result<()> {
        for task in &self.trigger_tasks {
            task.abort();
        }
        let _ = self.shutdown_tx.send(());

        let mut server_task = self.server_task;
        let served = match tokio::time::timeout(self.shutdown_timeout, &mut server_task).await {
            Ok(joined) => joined.map_err(|e| DevServeError::Server(e.to_string()))?,
            Err(_) => {
                warn!(
                    "In-flight requests still running after {:?}; stopping without them",
                    self.shutdown_timeout
                );
                server_task.abort();
                Ok(())
            }
        };

        self.controller.shutdown().await;
        served.map_err(DevServeError::Server)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
