//! Batch engine construction.

use docket_core::{Config, MetadataValidator, StandardMetadataValidator};
use docket_db::{DocumentStore, PgDocumentStore};
use docket_worker::BatchEngine;
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::init_production_mode;
use crate::state::{AppState, BatchState, SecurityConfig};

/// Build the PostgreSQL-backed engine, start its workers and assemble the state.
pub fn initialize_services(config: &Config, pool: PgPool) -> Arc<AppState> {
    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool));
    let state = build_state(config, store);
    state.batch.engine.start();
    state
}

/// Assemble application state around an arbitrary document store. The engine is
/// returned idle.
pub fn build_state(config: &Config, store: Arc<dyn DocumentStore>) -> Arc<AppState> {
    init_production_mode(config.is_production());

    let validator: Arc<dyn MetadataValidator> = Arc::new(StandardMetadataValidator::new());
    let engine = Arc::new(BatchEngine::new(
        store.clone(),
        validator,
        config.batch.clone(),
    ));

    Arc::new(AppState {
        batch: BatchState { engine, store },
        security: SecurityConfig {
            trusted_proxy_count: config.trusted_proxy_count(),
        },
        is_production: config.is_production(),
    })
}
