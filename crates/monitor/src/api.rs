//! HTTP API for health checks, Prometheus metrics and cycle reports

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use monitor_lib::{
    health::{ComponentStatus, HealthRegistry},
    monitor::CycleHistory,
    observability::MonitorMetrics,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: MonitorMetrics,
    pub history: CycleHistory,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, metrics: MonitorMetrics, history: CycleHistory) -> Self {
        Self {
            health_registry,
            metrics,
            history,
        }
    }
}

/// 200 while healthy or degraded, 503 when a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Most recent cycle result; 404 until the first cycle has completed
async fn latest_report(State(state): State<Arc<AppState>>) -> Response {
    match state.history.latest().await {
        Some(result) => Json(result.as_ref().clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no cycle has completed yet" })),
        )
            .into_response(),
    }
}

/// Summaries of retained cycles, oldest first
async fn report_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.history.summaries().await)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/report/latest", get(latest_report))
        .route("/report/history", get(report_history))
        .with_state(state)
}

/// Run the API server until it stops; a bind or serve failure is logged
/// and withdraws readiness
pub async fn run_server(port: u16, state: Arc<AppState>) {
    if let Err(e) = serve(port, state.clone()).await {
        error!(port, error = %e, "API server failed");
        state.health_registry.set_ready(false).await;
    }
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
