// Tests for the DevServe HTTP surface
use crate::{
    config::DevServeConfig,
    engine::{
        ConstructionError, DevServeProvider, EngineHandle, ExecutionError, GraphQLEngine, ProviderRegistry,
        ReleaseError, ReloadController, ReloadError, SchemaEngine,
    },
    models::{ExecutionInput, ExecutionResult, ReloadPhase},
    server::{create_router, parse_request, DevServeServer},
    DevServeError,
};

use async_graphql::{EmptyMutation, EmptySubscription, Object, Schema};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use hyper::body::to_bytes;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::{sync::Arc, time::Duration};
use tokio::sync::{Notify, Semaphore};
use tower::ServiceExt;

// Test helpers

struct Query;

#[Object]
impl Query {
    async fn greeting(&self) -> &str {
        "hi"
    }
}

/// Engine answering `{"version": N}`, optionally parked on a gate
struct VersionEngine {
    version: u64,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl GraphQLEngine for VersionEngine {
    async fn execute(&self, _input: ExecutionInput) -> Result<ExecutionResult, ExecutionError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        Ok(ExecutionResult::data(json!({ "version": self.version })))
    }

    async fn release(&self) -> Result<(), ReleaseError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingEngine;

#[async_trait]
impl GraphQLEngine for FailingEngine {
    async fn execute(&self, _input: ExecutionInput) -> Result<ExecutionResult, ExecutionError> {
        Err(ExecutionError::new("ValidationError", "Cannot query field \"nope\""))
    }
}

struct PanickingEngine;

#[async_trait]
impl GraphQLEngine for PanickingEngine {
    async fn execute(&self, _input: ExecutionInput) -> Result<ExecutionResult, ExecutionError> {
        panic!("engine blew up")
    }
}

/// Provider handing out a prebuilt engine
struct Fixed(Arc<dyn GraphQLEngine>);

#[async_trait]
impl DevServeProvider for Fixed {
    async fn engine(&self) -> Result<Arc<dyn GraphQLEngine>, ConstructionError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct GreetingProvider;

#[async_trait]
impl DevServeProvider for GreetingProvider {
    async fn engine(&self) -> Result<Arc<dyn GraphQLEngine>, ConstructionError> {
        Ok(Arc::new(SchemaEngine::new(Schema::new(
            Query,
            EmptyMutation,
            EmptySubscription,
        ))))
    }
}

fn registry_with(engine: Arc<dyn GraphQLEngine>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register_fn("test.Fixed", move |_ctx| {
        Ok(Box::new(Fixed(engine.clone())) as Box<dyn DevServeProvider>)
    });
    registry
}

async fn loaded_controller(registry: ProviderRegistry) -> Arc<ReloadController> {
    let controller = Arc::new(ReloadController::new(registry, Arc::new(EngineHandle::new())));
    controller.initial_load().await.unwrap();
    controller
}

fn graphql_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn version_engine(version: u64, gate: Option<Arc<Semaphore>>) -> (Arc<VersionEngine>, Arc<AtomicUsize>, Arc<AtomicBool>) {
    let entered = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicBool::new(false));
    let engine = Arc::new(VersionEngine {
        version,
        gate,
        entered: entered.clone(),
        released: released.clone(),
    });
    (engine, entered, released)
}

async fn wait_until(what: &str, check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what));
}

#[tokio::test]
async fn test_health_check() {
    let (engine, _, _) = version_engine(1, None);
    let app = create_router(loaded_controller(registry_with(engine)).await, true);

    let response = send(&app, get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_graphql_query_success() {
    let mut registry = ProviderRegistry::new();
    registry.register::<GreetingProvider>();
    let app = create_router(loaded_controller(registry).await, true);

    let response = send(&app, graphql_request(json!({ "query": "{ greeting }" }))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "data": { "greeting": "hi" }, "errors": [] })
    );
}

#[tokio::test]
async fn test_introspection_query_is_served() {
    let mut registry = ProviderRegistry::new();
    registry.register::<GreetingProvider>();
    let app = create_router(loaded_controller(registry).await, true);

    let response = send(
        &app,
        graphql_request(json!({
            "query": "query IntrospectionQuery { __schema { queryType { name } } }",
            "operationName": "IntrospectionQuery",
            "variables": null
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["__schema"]["queryType"]["name"], "Query");
}

#[tokio::test]
async fn test_malformed_body_is_rejected_before_execution() {
    let (engine, entered, _) = version_engine(1, None);
    let app = create_router(loaded_controller(registry_with(engine)).await, true);

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/graphql")
            .body(Body::from("this is not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["extensions"]["exception"], "MalformedRequest");

    // Valid JSON, but no query
    let response = send(&app, graphql_request(json!({ "variables": {} }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(entered.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_engine_returns_503() {
    let (engine, _, _) = version_engine(1, None);
    let controller = Arc::new(ReloadController::new(registry_with(engine), Arc::new(EngineHandle::new())));
    let app = create_router(controller, true);

    let response = send(&app, graphql_request(json!({ "query": "{ version }" }))).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({ "errors": [{ "message": "Engine not initialized" }] })
    );
}

#[tokio::test]
async fn test_engine_error_returns_500_with_kind() {
    let app = create_router(loaded_controller(registry_with(Arc::new(FailingEngine))).await, true);

    let response = send(&app, graphql_request(json!({ "query": "{ nope }" }))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({
            "errors": [{
                "message": "Cannot query field \"nope\"",
                "extensions": { "exception": "ValidationError" }
            }]
        })
    );
}

#[tokio::test]
async fn test_engine_panic_returns_500() {
    let app = create_router(loaded_controller(registry_with(Arc::new(PanickingEngine))).await, true);

    let response = send(&app, graphql_request(json!({ "query": "{ x }" }))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["extensions"]["exception"], "Panic");

    // The server keeps serving after a panic
    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reload_endpoint_swaps_engine() {
    let builds = Arc::new(AtomicU64::new(0));
    let counter = builds.clone();
    let mut registry = ProviderRegistry::new();
    registry.register_fn("test.Counting", move |_ctx| {
        let version = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let (engine, _, _) = version_engine(version, None);
        Ok(Box::new(Fixed(engine)) as Box<dyn DevServeProvider>)
    });
    let app = create_router(loaded_controller(registry).await, true);

    let response = send(&app, graphql_request(json!({ "query": "{ version }" }))).await;
    assert_eq!(body_json(response).await["data"]["version"], 1);

    let response = send(&app, post("/reload")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Reloaded successfully");

    let response = send(&app, graphql_request(json!({ "query": "{ version }" }))).await;
    assert_eq!(body_json(response).await["data"]["version"], 2);

    let response = send(&app, get("/status")).await;
    let status = body_json(response).await;
    assert_eq!(status["generation"], 2);
    assert_eq!(status["reload_count"], 2);
    assert_eq!(status["phase"], "idle");
    assert_eq!(status["provider"], "test.Counting");
}

#[tokio::test]
async fn test_failed_reload_returns_500_and_keeps_engine() {
    let builds = Arc::new(AtomicU64::new(0));
    let counter = builds.clone();
    let mut registry = ProviderRegistry::new();
    registry.register_fn("test.Flaky", move |_ctx| {
        if counter.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(ConstructionError::new("compilation error in schema module"));
        }
        let (engine, _, _) = version_engine(1, None);
        Ok(Box::new(Fixed(engine)) as Box<dyn DevServeProvider>)
    });
    let app = create_router(loaded_controller(registry).await, true);

    let response = send(&app, post("/reload")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_text(response).await;
    assert!(text.starts_with("Reload failed: "));
    assert!(text.contains("compilation error in schema module"));

    let response = send(&app, graphql_request(json!({ "query": "{ version }" }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["version"], 1);

    let status = body_json(send(&app, get("/status")).await).await;
    assert_eq!(status["generation"], 1);
    assert!(status["last_error"].as_str().unwrap().contains("compilation error"));
}

/// Provider whose second construction waits until released
struct SlowProvider {
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl DevServeProvider for SlowProvider {
    async fn engine(&self) -> Result<Arc<dyn GraphQLEngine>, ConstructionError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let (engine, _, _) = version_engine(1, None);
        Ok(engine as Arc<dyn GraphQLEngine>)
    }
}

#[tokio::test]
async fn test_concurrent_reload_returns_409() {
    let gate = Arc::new(Notify::new());
    let builds = Arc::new(AtomicU64::new(0));
    let (counter, provider_gate) = (builds.clone(), gate.clone());
    let mut registry = ProviderRegistry::new();
    registry.register_fn("test.Slow", move |_ctx| {
        let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
        Ok(Box::new(SlowProvider {
            gate: if first { None } else { Some(provider_gate.clone()) },
        }) as Box<dyn DevServeProvider>)
    });
    let controller = loaded_controller(registry).await;
    let app = create_router(controller.clone(), true);

    let in_progress = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.reload().await })
    };
    let watcher = controller.clone();
    tokio::time::timeout(Duration::from_secs(5), async {
        while watcher.status().await.phase != ReloadPhase::Reloading {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let response = send(&app, post("/reload")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_text(response).await, "Reload already in progress");

    gate.notify_one();
    assert!(in_progress.await.unwrap().is_ok());
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_in_flight_requests_finish_on_old_engine() {
    let gate = Arc::new(Semaphore::new(0));
    let (old_engine, old_entered, old_released) = version_engine(1, Some(gate.clone()));
    let (new_engine, _, new_released) = version_engine(2, None);

    let sequence: Vec<Arc<dyn GraphQLEngine>> = vec![new_engine, old_engine];
    let engines = Arc::new(std::sync::Mutex::new(sequence));
    let mut registry = ProviderRegistry::new();
    let queue = engines.clone();
    registry.register_fn("test.Sequence", move |_ctx| {
        let engine = queue.lock().unwrap().pop().unwrap();
        Ok(Box::new(Fixed(engine)) as Box<dyn DevServeProvider>)
    });
    let controller = loaded_controller(registry).await;
    let app = create_router(controller.clone(), true);

    let mut in_flight = Vec::new();
    for _ in 0..10 {
        let app = app.clone();
        in_flight.push(tokio::spawn(async move {
            let response = app
                .oneshot(graphql_request(json!({ "query": "{ version }" })))
                .await
                .unwrap();
            body_json(response).await
        }));
    }
    wait_until("requests to reach the old engine", || old_entered.load(Ordering::SeqCst) == 10).await;

    let reload = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.reload().await })
    };
    let handle = controller.handle().clone();
    wait_until("the new engine to be installed", || handle.generation() == 2).await;

    // New requests go to the new engine while the old one is still busy
    let response = send(&app, graphql_request(json!({ "query": "{ version }" }))).await;
    assert_eq!(body_json(response).await["data"]["version"], 2);
    assert!(!old_released.load(Ordering::SeqCst));

    gate.add_permits(10);
    for request in in_flight {
        assert_eq!(request.await.unwrap()["data"]["version"], 1);
    }

    let report = reload.await.unwrap().unwrap();
    assert_eq!(report.previous_generation, Some(1));
    assert!(old_released.load(Ordering::SeqCst));
    assert!(!new_released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_js_assets() {
    let (engine, _, _) = version_engine(1, None);
    let app = create_router(loaded_controller(registry_with(engine)).await, true);

    let response = send(&app, get("/js/introspection-patch.js")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/javascript");
    assert!(body_text(response).await.contains("createPatchedFetcher"));

    let response = send(&app, get("/js/missing.js")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "File not found: missing.js");

    let response = send(&app, get("/js/")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "File parameter missing");
}

#[tokio::test]
async fn test_graphiql_and_root() {
    let (engine, _, _) = version_engine(1, None);
    let app = create_router(loaded_controller(registry_with(engine)).await, true);

    let response = send(&app, get("/graphiql")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(body_text(response).await.contains("/js/introspection-patch.js"));

    let response = send(&app, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("url=/graphiql"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let (engine, _, _) = version_engine(1, None);
    let app = create_router(loaded_controller(registry_with(engine)).await, true);

    let response = send(
        &app,
        Request::builder()
            .method("OPTIONS")
            .uri("/graphql")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_server_binds_ephemeral_port() {
    let (engine, _, released) = version_engine(7, None);
    let config = DevServeConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..Default::default()
    };

    let running = DevServeServer::new(config, registry_with(engine)).start().await.unwrap();
    let addr = running.local_addr();
    assert_ne!(addr.port(), 0);

    let client = reqwest::Client::new();
    let health = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "OK");

    let body: Value = client
        .post(format!("http://{}/graphql", addr))
        .json(&json!({ "query": "{ version }" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["version"], 7);

    running.shutdown().await.unwrap();
    assert!(released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_server_binds_hostname() {
    let (engine, _, _) = version_engine(1, None);
    let config = DevServeConfig {
        host: "localhost".into(),
        port: 0,
        ..Default::default()
    };

    let running = DevServeServer::new(config, registry_with(engine)).start().await.unwrap();
    let addr = running.local_addr();
    assert!(addr.ip().is_loopback());

    let health = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");

    running.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_is_bounded_by_drain_timeout() {
    let gate = Arc::new(Semaphore::new(0));
    let (engine, entered, released) = version_engine(1, Some(gate.clone()));
    let config = DevServeConfig {
        host: "127.0.0.1".into(),
        port: 0,
        drain_timeout_ms: 200,
        ..Default::default()
    };

    let running = DevServeServer::new(config, registry_with(engine)).start().await.unwrap();
    let url = format!("http://{}/graphql", running.local_addr());
    let stuck = tokio::spawn(async move {
        reqwest::Client::new()
            .post(url)
            .json(&json!({ "query": "{ version }" }))
            .send()
            .await
    });
    wait_until("the request to reach the engine", || entered.load(Ordering::SeqCst) == 1).await;

    tokio::time::timeout(Duration::from_secs(3), running.shutdown())
        .await
        .expect("shutdown waited on the stuck request")
        .unwrap();

    // The engine is only released once the request lets go of it
    assert!(!released.load(Ordering::SeqCst));
    gate.add_permits(1);
    wait_until("the engine to be released", || released.load(Ordering::SeqCst)).await;
    let _ = stuck.await;
}

#[tokio::test]
async fn test_server_refuses_to_start_without_provider() {
    let config = DevServeConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..Default::default()
    };

    let result = DevServeServer::new(config, ProviderRegistry::new()).start().await;

    assert!(matches!(result, Err(DevServeError::Reload(ReloadError::Discovery(_)))));
}

#[test]
fn test_parse_request() {
    let input = tokio_test::assert_ok!(parse_request(br#"{"query":"{ a }","variables":null}"#));
    assert_eq!(input.query, "{ a }");
    assert!(input.variables.is_empty());

    let err = tokio_test::assert_err!(parse_request(br#"{"variables":{}}"#));
    assert!(err.to_string().starts_with("Malformed GraphQL request: "));
}
