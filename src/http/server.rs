//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeout, limits, journal)
//! - Bind server to listener
//! - Apply hot-reloaded configuration
//! - Graceful shutdown on the shared shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    middleware,
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::AppConfig;
use crate::http::middleware::{process_time, request_log};
use crate::http::request::{make_request_span, MakeRequestUuidV4};
use crate::http::{items, websocket};
use crate::journal::{FileSink, LogSink, RequestLogger};
use crate::observability::OperationalErrors;
use crate::registry::ConnectionRegistry;
use crate::security::token_guard;
use crate::store::ItemStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<AppConfig>>,
    pub registry: Arc<ConnectionRegistry>,
    pub logger: Arc<RequestLogger>,
    pub items: Arc<ItemStore>,
    pub errors: Arc<OperationalErrors>,
    pub started_at: Instant,
}

/// HTTP server for relaylog.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server journaling to the configured log file.
    pub fn new(config: AppConfig) -> Self {
        let sink = Arc::new(FileSink::new(&config.request_log.path));
        Self::with_sink(config, sink)
    }

    /// Create a server journaling to the given sink.
    pub fn with_sink(config: AppConfig, sink: Arc<dyn LogSink>) -> Self {
        let errors = Arc::new(OperationalErrors::new(config.errors.recent_capacity));
        let logger = Arc::new(
            RequestLogger::new(sink, Arc::clone(&errors), &config.request_log)
                .with_read_limit(config.security.max_body_size),
        );

        let state = AppState {
            config: Arc::new(ArcSwap::from_pointee(config.clone())),
            registry: Arc::new(ConnectionRegistry::new()),
            logger,
            items: Arc::new(ItemStore::with_fixtures()),
            errors,
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let item_routes = Router::new()
            .route("/items/", get(items::list_items).post(items::create_item))
            .route("/items/{item_id}", get(items::read_item))
            .route_layer(middleware::from_fn_with_state(state.clone(), token_guard));

        let mut http_routes = Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .merge(item_routes);
        if config.admin.enabled {
            http_routes = http_routes.merge(setup_admin_router(state.clone()));
        }
        let http_routes = journaled(http_routes.fallback(any(not_found)), config, state.clone());

        let ws_routes = Router::new()
            .route("/ws", get(websocket::echo_handler))
            .route("/ws/{client_id}", get(websocket::chat_handler))
            .route("/items/{item_id}/ws", get(websocket::item_socket_handler))
            .layer(TimeoutLayer::new(config.timeouts.request()));

        Router::new()
            .merge(ws_routes)
            .merge(http_routes)
            .with_state(state)
            .layer(middleware::from_fn(process_time))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Shared state, for embedding and tests.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let live_config = Arc::clone(&self.state.config);
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                apply_config_update(&live_config, new_config);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Journal `routes`, with the body limit and timeout answering inside the
/// journaled region so their 413 and 408 responses become output entries.
#[allow(deprecated)]
fn journaled(routes: Router<AppState>, config: &AppConfig, state: AppState) -> Router<AppState> {
    routes
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(TimeoutLayer::new(config.timeouts.request()))
        .layer(middleware::from_fn_with_state(state, request_log))
}

/// Swap in a reloaded config, warning about sections that only apply at startup.
pub fn apply_config_update(live: &ArcSwap<AppConfig>, new_config: AppConfig) {
    let current = live.load();
    let mut restart_needed = Vec::new();
    if current.listener != new_config.listener {
        restart_needed.push("listener");
    }
    if current.request_log != new_config.request_log {
        restart_needed.push("request_log");
    }
    if current.timeouts != new_config.timeouts {
        restart_needed.push("timeouts");
    }
    if current.security != new_config.security {
        restart_needed.push("security");
    }
    if current.admin.enabled != new_config.admin.enabled {
        restart_needed.push("admin.enabled");
    }
    if current.observability != new_config.observability {
        restart_needed.push("observability");
    }
    if !restart_needed.is_empty() {
        tracing::warn!(sections = ?restart_needed, "Config changes take effect after restart");
    }

    live.store(Arc::new(new_config));
    tracing::info!("Configuration reloaded");
}

async fn root() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> (axum::http::StatusCode, Json<Value>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Not Found" })),
    )
}
