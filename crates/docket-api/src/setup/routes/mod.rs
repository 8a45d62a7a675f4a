//! Route configuration and setup.

mod health;

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body. A full batch of ids plus a patch fits comfortably.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(batch_routes())
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::liveness_check))
        .route("/ready", get(health::readiness_check))
}

fn batch_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/documents/batch/metadata", API_PREFIX),
            post(handlers::batch::submit_batch_metadata),
        )
        .route(
            &format!("{}/documents/batch/tasks/{{task_id}}", API_PREFIX),
            get(handlers::batch::get_batch_task),
        )
}
