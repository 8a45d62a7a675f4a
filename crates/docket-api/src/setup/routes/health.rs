//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use docket_core::models::TaskCounts;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns "healthy", "timeout", or
/// "{prefix}: {error}" (just "{prefix}" when errors are not exposed).
async fn run_check<F, E>(f: F, error_prefix: &str, expose_errors: bool) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(TIMEOUT, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) if expose_errors => format!("{}: {}", error_prefix, e),
        Ok(Err(_)) => error_prefix.to_string(),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub batch_engine: String,
    /// Tasks queued or running.
    pub pending: usize,
    pub max_documents: usize,
    pub tasks: TaskCounts,
}

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness probe - the engine is accepting work and the store is reachable.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.batch.store.clone();
    let database = run_check(
        async move { store.open_session().await.map(drop) },
        "not_ready",
        !state.is_production,
    )
    .await;

    let engine_running = state.batch.engine.is_running();
    if database != "healthy" {
        tracing::error!(database = %database, "Readiness check failed");
    }

    let ready = engine_running && database == "healthy";
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "database": database,
            "batch_engine": engine_state(engine_running),
        })),
    )
}

/// Full health check: store connectivity plus batch engine task counts.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.batch.store.clone();
    let database = run_check(
        async move { store.open_session().await.map(drop) },
        "unhealthy",
        !state.is_production,
    )
    .await;

    let engine = &state.batch.engine;
    let engine_running = engine.is_running();
    let overall_healthy = database == "healthy" && engine_running;

    let response = HealthCheckResponse {
        status: if overall_healthy { "healthy" } else { "degraded" }.to_string(),
        database,
        batch_engine: engine_state(engine_running).to_string(),
        pending: engine.pending(),
        max_documents: engine.max_documents(),
        tasks: engine.counts(),
    };

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

fn engine_state(running: bool) -> &'static str {
    if running {
        "running"
    } else {
        "stopped"
    }
}
