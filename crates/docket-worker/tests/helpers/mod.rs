//! Test helpers: build a batch engine over an in-memory document store.

use chrono::Utc;
use docket_core::models::{Document, DocumentId, MetadataPatch, TaskState, TaskStatus};
use docket_core::{BatchConfig, StandardMetadataValidator};
use docket_db::InMemoryDocumentStore;
use docket_worker::{BatchEngine, SubmitBatch};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_USER_ID: i64 = 42;
pub const TEST_ORIGIN: &str = "203.0.113.7";

/// Engine plus the store it writes to.
pub struct TestEngine {
    pub engine: Arc<BatchEngine>,
    pub store: InMemoryDocumentStore,
}

/// Batch settings tuned for fast tests.
pub fn test_config(workers: usize) -> BatchConfig {
    BatchConfig {
        workers,
        poll_interval_ms: 20,
        shutdown_grace_secs: 5,
        ..BatchConfig::default()
    }
}

pub fn setup_engine(config: BatchConfig) -> TestEngine {
    let store = InMemoryDocumentStore::new();
    let engine = Arc::new(BatchEngine::new(
        Arc::new(store.clone()),
        Arc::new(StandardMetadataValidator::new()),
        config,
    ));
    TestEngine { engine, store }
}

pub fn document(id: DocumentId) -> Document {
    let now = Utc::now();
    Document {
        id,
        filename: format!("{:08}.pdf", id),
        original_filename: format!("digitalizado-{}.pdf", id),
        file_size: 4096,
        file_hash: format!("{:064x}", id),
        title: Some(format!("Contrato {}", id)),
        author: Some("Maria Souza".to_string()),
        subject: Some("Prestação de serviços".to_string()),
        doc_type: Some("contrato".to_string()),
        digitizer_name: Some("Carlos Lima".to_string()),
        digitizer_cpf_cnpj: Some("52998224725".to_string()),
        resolution_dpi: Some(300),
        equipment_info: Some("Scanner A3".to_string()),
        company_name: Some("Acme Ltda".to_string()),
        company_cnpj: Some("11222333000181".to_string()),
        document_type: Some("Contrato".to_string()),
        document_category: Some("Jurídico".to_string()),
        uploaded_at: now,
        updated_at: now,
        uploaded_by: 1,
    }
}

pub fn author_patch(author: &str) -> MetadataPatch {
    MetadataPatch {
        author: Some(author.to_string()),
        ..Default::default()
    }
}

pub fn batch(document_ids: Vec<DocumentId>, metadata_patch: MetadataPatch) -> SubmitBatch {
    SubmitBatch {
        document_ids,
        metadata_patch,
        submitted_by: TEST_USER_ID,
        origin_address: TEST_ORIGIN.to_string(),
    }
}

/// Poll until the task reaches a terminal state.
pub async fn wait_for_terminal(engine: &BatchEngine, task_id: &str) -> TaskStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(status) = engine.status(task_id) {
            if status.status.is_terminal() {
                return status;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("task {} did not finish in time", task_id);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Position of a state in the lifecycle, for monotonicity checks.
pub fn progress(state: TaskState) -> u8 {
    match state {
        TaskState::Queued => 0,
        TaskState::Processing => 1,
        TaskState::Completed | TaskState::Failed => 2,
    }
}
