//! HTTP API for the orchestrator
//!
//! The presentation surface: route/amount input, attempt submission, state
//! polling, plus health and Prometheus metrics endpoints. Submission while
//! an attempt is in flight is rejected here, at the boundary, since the
//! core does not enforce mutual exclusion.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use eyre::{eyre, Result};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::info;

use crate::balance::format_balance;
use crate::chains::{explorer_base_url, ChainInfo};
use crate::config::ApiConfig;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    started: Instant,
}

#[derive(Deserialize)]
struct BridgeRequest {
    amount: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteRequest {
    source_chain: String,
    destination_chain: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    current_step: String,
    is_loading: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.orchestrator.snapshot();
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
        current_step: snapshot.current_step.to_string(),
        is_loading: snapshot.is_loading,
    })
}

/// Liveness probe (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Prometheus metrics endpoint
async fn prometheus_metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response();
    }

    match Response::builder()
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(axum::body::Body::from(buffer))
    {
        Ok(resp) => resp,
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build metrics response",
        )
            .into_response(),
    }
}

/// Chain list entry: the engine metadata plus the explorer origin derived
/// from its transaction URL template.
fn chain_payload(chain: &ChainInfo) -> Value {
    let mut value = serde_json::to_value(chain).unwrap_or(Value::Null);
    if let (Value::Object(fields), Some(template)) = (&mut value, chain.explorer_url.as_deref()) {
        if let Some(base) = explorer_base_url(template) {
            fields.insert("explorerBase".to_string(), Value::String(base));
        }
    }
    value
}

async fn list_chains(State(state): State<AppState>) -> Response {
    let chains: Vec<Value> = state
        .orchestrator
        .chains()
        .iter()
        .map(chain_payload)
        .collect();
    Json(chains).into_response()
}

async fn get_state(State(state): State<AppState>) -> Response {
    Json(state.orchestrator.snapshot()).into_response()
}

async fn get_balance(State(state): State<AppState>) -> Response {
    let balance = state.orchestrator.refresh_balance().await;
    Json(json!({
        "balance": balance,
        "formatted": format_balance(&balance),
    }))
    .into_response()
}

async fn set_route(State(state): State<AppState>, Json(req): Json<RouteRequest>) -> Response {
    state
        .orchestrator
        .set_route(req.source_chain, req.destination_chain);
    // Balance follows the source chain
    state.orchestrator.refresh_balance().await;
    Json(state.orchestrator.snapshot()).into_response()
}

async fn swap_chains(State(state): State<AppState>) -> Response {
    state.orchestrator.swap_chains();
    state.orchestrator.refresh_balance().await;
    Json(state.orchestrator.snapshot()).into_response()
}

async fn submit_bridge(State(state): State<AppState>, Json(req): Json<BridgeRequest>) -> Response {
    if state.orchestrator.is_in_flight() {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": "a transfer attempt is already in flight"})),
        )
            .into_response();
    }

    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        orchestrator.submit(&req.amount).await;
    });

    (StatusCode::ACCEPTED, Json(state.orchestrator.snapshot())).into_response()
}

async fn reset(State(state): State<AppState>) -> Response {
    state.orchestrator.reset();
    Json(state.orchestrator.snapshot()).into_response()
}

/// Build the router: read-only routes plus rate-limited mutating routes.
pub fn build_router(orchestrator: Arc<Orchestrator>, api_config: &ApiConfig) -> Result<Router> {
    let state = AppState {
        orchestrator,
        started: Instant::now(),
    };

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(api_config.rate_per_second)
            .burst_size(api_config.rate_burst)
            .finish()
            .ok_or_else(|| eyre!("invalid rate limit configuration"))?,
    );

    let mutating = Router::new()
        .route("/api/route", post(set_route))
        .route("/api/swap", post(swap_chains))
        .route("/api/bridge", post(submit_bridge))
        .route("/api/reset", post(reset))
        .layer(GovernorLayer::new(governor_conf));

    Ok(Router::new()
        .route("/health", get(health))
        .route("/healthz", get(liveness))
        .route("/metrics", get(prometheus_metrics))
        .route("/api/chains", get(list_chains))
        .route("/api/state", get(get_state))
        .route("/api/balance", get(get_balance))
        .merge(mutating)
        .with_state(state))
}

/// Start the API server.
pub async fn serve(
    addr: SocketAddr,
    orchestrator: Arc<Orchestrator>,
    api_config: &ApiConfig,
) -> Result<()> {
    let app = build_router(orchestrator, api_config)?;

    info!(%addr, "API server started");
    info!("  /health      - Health status (JSON)");
    info!("  /metrics     - Prometheus metrics");
    info!("  /api/state   - Transfer progress snapshot");
    info!("  /api/bridge  - Submit a transfer");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
