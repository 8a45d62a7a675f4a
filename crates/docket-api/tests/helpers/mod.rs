//! Test helpers: build the router over an in-memory document store.
//!
//! Run from workspace root: `cargo test -p docket-api`.

#![allow(dead_code)]

use axum_test::TestServer;
use chrono::Utc;
use docket_api::constants;
use docket_api::setup::{routes, services};
use docket_api::state::AppState;
use docket_core::models::{Document, DocumentId};
use docket_core::Config;
use docket_db::InMemoryDocumentStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_USER_ID: i64 = 42;

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus handles on the state and store behind it.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub store: InMemoryDocumentStore,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Test configuration for the given `ENVIRONMENT`.
pub fn test_config(environment: &str) -> Config {
    let mut config = Config::from_vars(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/docket_test".to_string()),
        "BATCH_MAX_DOCUMENTS" => Some("5".to_string()),
        "ENVIRONMENT" => Some(environment.to_string()),
        _ => None,
    })
    .expect("test config");
    config.batch.poll_interval_ms = 20;
    config.batch.shutdown_grace_secs = 2;
    config
}

/// Router with a started engine over an empty in-memory store.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config("development"))
}

/// Like [`setup_test_app`], with an explicit configuration.
pub fn setup_test_app_with(config: Config) -> TestApp {
    let store = InMemoryDocumentStore::new();
    let state = services::build_state(&config, Arc::new(store.clone()));
    state.batch.engine.start();

    let app = routes::setup_routes(state.clone());
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        store,
    }
}

pub fn document(id: DocumentId) -> Document {
    let now = Utc::now();
    Document {
        id,
        filename: format!("{:08}.pdf", id),
        original_filename: format!("digitalizado-{}.pdf", id),
        file_size: 2048,
        file_hash: format!("{:064x}", id),
        title: Some(format!("Ata {}", id)),
        author: Some("Maria Souza".to_string()),
        subject: None,
        doc_type: Some("ata".to_string()),
        digitizer_name: None,
        digitizer_cpf_cnpj: None,
        resolution_dpi: None,
        equipment_info: None,
        company_name: None,
        company_cnpj: None,
        document_type: None,
        document_category: None,
        uploaded_at: now,
        updated_at: now,
        uploaded_by: 1,
    }
}

/// Poll the status endpoint until the task reaches a terminal state.
pub async fn wait_for_task(client: &TestServer, task_id: &str) -> Value {
    let path = api_path(&format!("/documents/batch/tasks/{}", task_id));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let response = client
            .get(&path)
            .add_header("X-User-Id", TEST_USER_ID.to_string())
            .await;
        assert_eq!(response.status_code(), 200);

        let body: Value = response.json();
        if matches!(body["status"].as_str(), Some("completed") | Some("failed")) {
            return body;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {} did not finish: {}",
            task_id,
            body
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
