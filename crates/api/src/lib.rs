//! Alert Receiver API Server
//!
//! Accepts Alertmanager batches over HTTP and reconciles them into the
//! stored alert histories of open entities.

use anyhow::Context;
use axum::{extract::State, response::IntoResponse, routing::{get, post}, Json, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod error;
mod routes;
mod settings;

pub use error::ApiError;
pub use settings::{ReceiverSettings, ServerConfig, TopicRoute, CONFIG_PATH_ENV};

use alert_history::{EntityStore, InMemoryEntityStore};
use reconciler::{ReceiverConfig, ReconciliationService};

/// Application state shared across handlers
pub struct AppState {
    /// Reconciliation service
    pub service: Arc<ReconciliationService>,
    /// Receivers by token
    pub receivers: HashMap<String, ReceiverConfig>,
    /// Prometheus exposition handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state over an entity store
    pub fn new(config: &ServerConfig, store: Arc<dyn EntityStore>) -> Self {
        Self {
            service: Arc::new(ReconciliationService::new(store, &config.reconciler)),
            receivers: config.receiver_map(),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub receivers: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route(
            "/api/v1/receivers/:token/batches",
            post(routes::batches::post_batch),
        )
        .route("/api/v1/alerts/counts", get(routes::alerts::get_counts))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        receivers: state.receivers.len(),
    })
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Initialize logging
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let level: Level = level.parse().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("Failed to set tracing subscriber")
}

/// Load seed entities from a JSON object keyed by entity id
pub fn load_entities(path: &Path, store: &InMemoryEntityStore) -> anyhow::Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading entities from {}", path.display()))?;
    store
        .seed_json(&raw)
        .with_context(|| format!("loading entities from {}", path.display()))
}

/// Application state over an in-memory store seeded from `entities_file`
pub fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let store = Arc::new(InMemoryEntityStore::new());
    if let Some(path) = &config.entities_file {
        let count = load_entities(path, &store)?;
        info!("Loaded {} entities from {}", count, path.display());
    }
    Ok(AppState::new(config, store))
}

/// Run the server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let state = Arc::new(build_state(&config)?.with_metrics(metrics));
    let app = create_router(state);

    info!("Starting API server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
