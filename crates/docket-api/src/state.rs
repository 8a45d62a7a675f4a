//! Application state and sub-state extractors.
//!
//! Handlers extract only the sub-state they need via Axum's `FromRef`.

use axum::extract::FromRef;
use docket_db::DocumentStore;
use docket_worker::BatchEngine;
use std::sync::Arc;

/// Batch engine plus the document store it writes through.
#[derive(Clone)]
pub struct BatchState {
    pub engine: Arc<BatchEngine>,
    pub store: Arc<dyn DocumentStore>,
}

#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Reverse proxies in front of the service whose `X-Forwarded-For` entries are trusted.
    pub trusted_proxy_count: usize,
}

pub struct AppState {
    pub batch: BatchState,
    pub security: SecurityConfig,
    pub is_production: bool,
}

impl FromRef<Arc<AppState>> for BatchState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.batch.clone()
    }
}

impl FromRef<Arc<AppState>> for SecurityConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.security.clone()
    }
}
