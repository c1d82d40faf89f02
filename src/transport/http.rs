//! HTTP + SSE transport.
//!
//! JSON-RPC rides `POST /rpc` (alias `POST /message`); `GET /sse` opens a
//! broadcast event stream. JSON-RPC level errors ride HTTP 200; protocol
//! notifications acknowledge with 204. Every handler-built response carries
//! permissive CORS headers, and `OPTIONS` preflights short-circuit to 204.

use actix_web::http::Method;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;

use crate::error::{Result, ServerError};
use crate::protocol::{JsonRpcNotification, Router};
use crate::server::hooks::HookEvent;
use crate::server::{ServerState, StateCell};
use crate::transport::sse::SseClientMap;
use crate::transport::TransportKind;
use crate::utils;
use crate::utils::auth::{AuthConfig, RequestMeta};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// MCP server speaking JSON-RPC over HTTP with SSE broadcast.
pub struct HttpSseServer {
    router: Router,
    auth: Option<AuthConfig>,
    bind_address: String,
    port: u16,
    clients: SseClientMap,
    state: Arc<StateCell>,
    started_at: Arc<std::sync::RwLock<Option<Instant>>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    router: Router,
    auth: Option<AuthConfig>,
    clients: SseClientMap,
    state: Arc<StateCell>,
    started_at: Arc<std::sync::RwLock<Option<Instant>>>,
}

impl HttpSseServer {
    pub(crate) fn new(
        router: Router,
        auth: Option<AuthConfig>,
        bind_address: String,
        port: u16,
    ) -> Self {
        let clients = SseClientMap::new(Arc::clone(router.stats()));
        HttpSseServer {
            router,
            auth,
            bind_address,
            port,
            clients,
            state: Arc::new(StateCell::new()),
            started_at: Arc::new(std::sync::RwLock::new(None)),
            shutdown: Mutex::new(None),
        }
    }

    fn app_state(&self) -> AppState {
        AppState {
            router: self.router.clone(),
            auth: self.auth.clone(),
            clients: self.clients.clone(),
            state: Arc::clone(&self.state),
            started_at: Arc::clone(&self.started_at),
        }
    }

    /// Bind the listener and start serving. Fails if the server is not
    /// stopped or the address cannot be bound.
    pub async fn start(&self) -> Result<()> {
        let current = self.state.get();
        if current != ServerState::Stopped {
            return Err(ServerError::State(format!(
                "cannot start HTTP transport from state '{}'",
                current
            )));
        }
        self.state.set(ServerState::Starting);

        let state = self.app_state();
        let bind_addr = format!("{}:{}", self.bind_address, self.port);

        let server = match HttpServer::new(move || build_app(state.clone(), MAX_BODY_BYTES))
            .bind(&bind_addr)
        {
            Ok(server) => server,
            Err(e) => {
                let message = format!("Failed to bind {}: {}", bind_addr, e);
                error!(addr = %bind_addr, error = %e, "bind failed");
                self.router.stats().record_error(&message);
                self.state.set(ServerState::Error);
                return Err(ServerError::Transport(message));
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown.lock().await = Some(shutdown_tx);

        let state_cell = Arc::clone(&self.state);
        let server = server.run();
        tokio::spawn(async move {
            tokio::select! {
                result = server => {
                    if let Err(e) = result {
                        error!(error = %e, "HTTP server error");
                        state_cell.set(ServerState::Error);
                    }
                }
                _ = shutdown_rx => {
                    info!("HTTP transport shutdown signal received");
                }
            }
        });

        if let Ok(mut guard) = self.started_at.write() {
            *guard = Some(Instant::now());
        }
        self.state.set(ServerState::Running);
        info!(addr = %bind_addr, "HTTP transport listening");
        self.router
            .hooks()
            .emit(&HookEvent::ServerStarted {
                transport: TransportKind::HttpSse,
            })
            .await;
        Ok(())
    }

    /// Stop the listener, end all SSE streams, and reset statistics.
    /// Stopping a stopped server is a no-op.
    pub async fn stop(&self) -> Result<()> {
        match self.state.get() {
            ServerState::Stopped | ServerState::Stopping => return Ok(()),
            ServerState::Error => {
                // Terminal state: release clients but stay in error
                self.clients.clear().await;
                return Ok(());
            }
            _ => {}
        }
        self.state.set(ServerState::Stopping);
        info!("Stopping HTTP transport");

        if let Some(sender) = self.shutdown.lock().await.take() {
            if sender.send(()).is_err() {
                warn!("HTTP server task already exited");
            }
        }

        self.clients.clear().await;
        self.router.stats().reset();
        if let Ok(mut guard) = self.started_at.write() {
            *guard = None;
        }
        self.router.hooks().emit(&HookEvent::ServerStopped).await;
        self.state.set(ServerState::Stopped);
        info!("HTTP transport stopped");
        Ok(())
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Broadcast a server-initiated notification to every SSE client.
    pub async fn send_notification(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        let payload = serde_json::to_string(&notification)?;
        self.clients.broadcast(&payload).await;
        Ok(())
    }

    pub async fn active_clients(&self) -> usize {
        self.clients.len().await
    }

    /// Wait until the server reaches the stopped state.
    pub async fn wait_stopped(&self) {
        self.state.wait_for(ServerState::Stopped).await;
    }
}

/// Create the Actix Web application
fn build_app(
    state: AppState,
    max_payload: usize,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<
            tracing_actix_web::StreamSpan<actix_web::body::BoxBody>,
        >,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::PayloadConfig::new(max_payload))
        .wrap(TracingLogger::default())
        .service(
            web::resource("/sse")
                .route(web::get().to(handle_sse))
                .route(web::method(Method::OPTIONS).to(handle_preflight))
                .default_service(web::route().to(handle_method_not_allowed)),
        )
        .service(
            web::resource("/rpc")
                .route(web::post().to(handle_rpc))
                .route(web::method(Method::OPTIONS).to(handle_preflight))
                .default_service(web::route().to(handle_method_not_allowed)),
        )
        .service(
            web::resource("/message")
                .route(web::post().to(handle_rpc))
                .route(web::method(Method::OPTIONS).to(handle_preflight))
                .default_service(web::route().to(handle_method_not_allowed)),
        )
        .service(
            web::resource("/health")
                .route(web::get().to(handle_health))
                .route(web::method(Method::OPTIONS).to(handle_preflight))
                .default_service(web::route().to(handle_method_not_allowed)),
        )
        .default_service(web::route().to(handle_fallback))
}

fn with_cors(mut builder: actix_web::HttpResponseBuilder) -> actix_web::HttpResponseBuilder {
    builder.insert_header(("Access-Control-Allow-Origin", "*"));
    builder.insert_header(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
    builder.insert_header((
        "Access-Control-Allow-Headers",
        "Content-Type, Authorization, X-Api-Key, X-Client-Id",
    ));
    builder
}

fn request_meta(req: &HttpRequest) -> RequestMeta {
    let mut meta = RequestMeta::new(req.method().as_str(), req.path());
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            meta.headers
                .insert(name.as_str().to_ascii_lowercase(), value.to_string());
        }
    }
    meta
}

/// Returns the 401 response when the request fails the auth gate.
fn deny_if_unauthorized(state: &AppState, req: &HttpRequest) -> Option<HttpResponse> {
    let auth = state.auth.as_ref()?;
    let outcome = auth.authenticate(&request_meta(req));
    if outcome.authenticated {
        return None;
    }
    let reason = outcome
        .reason
        .unwrap_or_else(|| "Unauthorized".to_string());
    warn!(path = %req.path(), reason = %reason, "request rejected by auth gate");
    Some(with_cors(HttpResponse::Unauthorized()).json(json!({
        "error": "Unauthorized",
        "reason": reason,
    })))
}

/// Open an SSE stream for the caller.
async fn handle_sse(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(denied) = deny_if_unauthorized(&state, &req) {
        return denied;
    }

    let client_id = utils::generate_client_id();
    info!(client_id = %client_id, "SSE stream opened");
    let stream = state.clients.register(client_id.clone()).await;

    with_cors(HttpResponse::Ok())
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .insert_header(("X-Client-Id", client_id))
        .streaming(stream)
}

/// Handle one JSON-RPC payload. Responses also fan out to SSE clients.
async fn handle_rpc(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    if let Some(denied) = deny_if_unauthorized(&state, &req) {
        return denied;
    }

    let text = String::from_utf8_lossy(&body);
    match state.router.process_text(&text).await {
        Some(response) => match serde_json::to_string(&response) {
            Ok(payload) => {
                state.clients.broadcast(&payload).await;
                with_cors(HttpResponse::Ok())
                    .content_type("application/json")
                    .body(payload)
            }
            Err(e) => {
                error!(error = %e, "response serialization failed");
                with_cors(HttpResponse::InternalServerError())
                    .json(json!({ "error": "Response serialization failed" }))
            }
        },
        None => with_cors(HttpResponse::NoContent()).finish(),
    }
}

/// Liveness endpoint; the only route outside the auth gate.
async fn handle_health(state: web::Data<AppState>) -> HttpResponse {
    let uptime = state
        .started_at
        .read()
        .ok()
        .and_then(|guard| guard.map(|t| t.elapsed().as_secs()))
        .unwrap_or(0);
    let identity = state.router.identity();
    let registry = state.router.registry();
    let snapshot = state.router.stats().snapshot();

    with_cors(HttpResponse::Ok()).json(json!({
        "status": "ok",
        "server": {
            "name": identity.name.clone(),
            "version": identity.version.clone(),
            "state": state.state.get().to_string(),
            "uptime": uptime,
        },
        "capabilities": {
            "tools": registry.tool_count(),
            "resources": registry.resource_count(),
            "prompts": registry.prompt_count(),
        },
        "connections": {
            "active": state.clients.len().await,
            "total": snapshot.sse_connections_total,
        },
        "stats": snapshot,
        "timestamp": utils::generate_timestamp(),
    }))
}

async fn handle_preflight() -> HttpResponse {
    with_cors(HttpResponse::NoContent()).finish()
}

async fn handle_method_not_allowed(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> HttpResponse {
    if let Some(denied) = deny_if_unauthorized(&state, &req) {
        return denied;
    }
    with_cors(HttpResponse::MethodNotAllowed()).json(json!({ "error": "Method not allowed" }))
}

async fn handle_fallback(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return handle_preflight().await;
    }
    if let Some(denied) = deny_if_unauthorized(&state, &req) {
        return denied;
    }
    warn!(path = %req.path(), "unknown path");
    with_cors(HttpResponse::NotFound()).json(json!({ "error": "Not found" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::hooks::HookDispatcher;
    use crate::server::middleware::MiddlewareChain;
    use crate::server::registry::{CapabilityRegistry, ToolDefinition};
    use crate::server::stats::ServerStats;
    use crate::server::ServerIdentity;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use futures_util::StreamExt;

    fn test_state(auth: Option<AuthConfig>) -> AppState {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_tool(ToolDefinition::new(
                "echo",
                "Echo back the arguments",
                json!({"type": "object", "properties": {}, "required": []}),
                |args| async move { Ok(args) },
            ))
            .unwrap();

        let stats = Arc::new(ServerStats::new());
        let router = Router::new(
            ServerIdentity {
                name: "http-test".to_string(),
                version: "0.1.0".to_string(),
                description: None,
            },
            Arc::new(registry),
            MiddlewareChain::default(),
            HookDispatcher::default(),
            Arc::clone(&stats),
        );

        AppState {
            router,
            auth,
            clients: SseClientMap::new(stats),
            state: Arc::new(StateCell::new()),
            started_at: Arc::new(std::sync::RwLock::new(None)),
        }
    }

    #[actix_web::test]
    async fn test_rpc_round_trip_with_cors() {
        let app = test::init_service(build_app(test_state(None), MAX_BODY_BYTES)).await;

        let req = test::TestRequest::post()
            .uri("/rpc")
            .set_json(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["result"]["status"], "pong");
        assert_eq!(body["id"], 1);
    }

    #[actix_web::test]
    async fn test_notification_returns_204() {
        let app = test::init_service(build_app(test_state(None), MAX_BODY_BYTES)).await;

        let req = test::TestRequest::post()
            .uri("/message")
            .set_json(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_parse_error_rides_http_200() {
        let app = test::init_service(build_app(test_state(None), MAX_BODY_BYTES)).await;

        let req = test::TestRequest::post()
            .uri("/rpc")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["id"], Value::Null);
    }

    #[actix_web::test]
    async fn test_bearer_auth_gate() {
        let state = test_state(Some(AuthConfig::bearer("sekrit")));
        let app = test::init_service(build_app(state, MAX_BODY_BYTES)).await;

        let denied = test::TestRequest::post()
            .uri("/rpc")
            .set_json(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .to_request();
        let resp = test::call_service(&app, denied).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["reason"], "Missing Authorization header");

        let allowed = test::TestRequest::post()
            .uri("/rpc")
            .insert_header(("Authorization", "Bearer sekrit"))
            .set_json(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .to_request();
        let resp = test::call_service(&app, allowed).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_health_bypasses_auth() {
        let state = test_state(Some(AuthConfig::bearer("sekrit")));
        let app = test::init_service(build_app(state, MAX_BODY_BYTES)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["server"]["name"], "http-test");
        assert_eq!(body["capabilities"]["tools"], 1);
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn test_preflight_is_204_with_cors() {
        let state = test_state(Some(AuthConfig::bearer("sekrit")));
        let app = test::init_service(build_app(state, MAX_BODY_BYTES)).await;

        for uri in ["/rpc", "/sse", "/anywhere/else"] {
            let req = test::TestRequest::default()
                .method(Method::OPTIONS)
                .uri(uri)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT, "OPTIONS {}", uri);
            assert_eq!(
                resp.headers()
                    .get("Access-Control-Allow-Methods")
                    .unwrap(),
                "GET, POST, OPTIONS"
            );
        }
    }

    #[actix_web::test]
    async fn test_unknown_path_and_wrong_method() {
        let app = test::init_service(build_app(test_state(None), MAX_BODY_BYTES)).await;

        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/rpc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn test_oversized_body_is_413() {
        let app = test::init_service(build_app(test_state(None), 64)).await;

        let req = test::TestRequest::post()
            .uri("/rpc")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("x".repeat(256))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn test_sse_stream_opens_and_receives_broadcasts() {
        let state = test_state(None);
        let app = test::init_service(build_app(state.clone(), MAX_BODY_BYTES)).await;

        let req = test::TestRequest::get().uri("/sse").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "text/event-stream"
        );
        assert!(resp.headers().get("X-Client-Id").is_some());
        assert_eq!(state.clients.len().await, 1);

        // A second client registered directly on the map sees responses
        // broadcast from POSTed requests
        let mut observer = state.clients.register("observer".to_string()).await;
        let hello = observer.next().await.unwrap().unwrap();
        assert!(std::str::from_utf8(&hello).unwrap().contains("connected"));

        let req = test::TestRequest::post()
            .uri("/rpc")
            .set_json(json!({"jsonrpc": "2.0", "id": 7, "method": "ping"}))
            .to_request();
        test::call_service(&app, req).await;

        let frame = observer.next().await.unwrap().unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("data: "));
        assert!(text.contains("\"pong\""));
    }
}
