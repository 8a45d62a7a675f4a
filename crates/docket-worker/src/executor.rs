//! Executes one batch task against the document store.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use docket_core::models::document::AUDIT_ACTION_BATCH_UPDATE;
use docket_core::models::{BatchResult, BatchTask, DocumentId, DocumentOutcome, NewAuditRecord};
use docket_core::MetadataValidator;
use docket_db::{DocumentSession, DocumentStore};

pub const DOCUMENT_NOT_FOUND: &str = "document not found";

/// Why a single document could not be updated.
#[derive(Debug)]
enum DocumentFailure {
    NotFound,
    Invalid {
        errors: Vec<String>,
        title: String,
    },
    Persistence {
        error: anyhow::Error,
        title: Option<String>,
    },
}

impl DocumentFailure {
    fn into_outcome(self, document_id: DocumentId) -> DocumentOutcome {
        match self {
            DocumentFailure::NotFound => {
                DocumentOutcome::failed(document_id, DOCUMENT_NOT_FOUND, None)
            }
            DocumentFailure::Invalid { errors, title } => DocumentOutcome::failed(
                document_id,
                format!("validation failed: {}", errors.join(", ")),
                Some(title),
            ),
            DocumentFailure::Persistence { error, title } => {
                DocumentOutcome::failed(document_id, format!("{:#}", error), title)
            }
        }
    }
}

/// Outcomes of a running task, recorded as each document finishes. The pool holds a
/// clone so it can still report them if the task is aborted.
#[derive(Debug, Clone, Default)]
pub struct TaskProgress {
    outcomes: Arc<Mutex<Vec<DocumentOutcome>>>,
}

impl TaskProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DocumentOutcome>> {
        self.outcomes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, outcome: DocumentOutcome) {
        self.lock().push(outcome);
    }

    /// Outcomes recorded so far, in processing order.
    pub fn outcomes(&self) -> Vec<DocumentOutcome> {
        self.lock().clone()
    }
}

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Audit description listing the supplied fields, e.g.
/// `metadata updated in batch: title: 'Ata', author: 'Jane Doe'`.
pub fn audit_description(task: &BatchTask) -> String {
    let changes: Vec<String> = task
        .metadata_patch
        .changes()
        .into_iter()
        .map(|(field, value)| format!("{}: '{}'", field, value))
        .collect();
    format!("metadata updated in batch: {}", changes.join(", "))
}

#[derive(Clone)]
pub struct BatchExecutor {
    store: Arc<dyn DocumentStore>,
    validator: Arc<dyn MetadataValidator>,
}

impl BatchExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, validator: Arc<dyn MetadataValidator>) -> Self {
        Self { store, validator }
    }

    /// Apply the task's patch to each of its documents, in order.
    ///
    /// Per-document problems are reported in the result. An `Err` means the task as a
    /// whole could not run (for example the store refused a session).
    pub async fn execute(&self, task: &BatchTask) -> Result<BatchResult> {
        self.execute_with_progress(task, &TaskProgress::new()).await
    }

    /// Like [`execute`](Self::execute), recording each outcome into `progress` as
    /// soon as the document is done.
    ///
    /// A panic while updating one document fails only that document, and the rest
    /// continue on a fresh session.
    #[tracing::instrument(skip_all, fields(task_id = %task.task_id, documents = task.total()))]
    pub async fn execute_with_progress(
        &self,
        task: &BatchTask,
        progress: &TaskProgress,
    ) -> Result<BatchResult> {
        let mut session = self.open_session().await?;

        for &document_id in &task.document_ids {
            let update = self.update_document(session.as_mut(), task, document_id);
            let attempt = AssertUnwindSafe(update).catch_unwind().await;

            let (outcome, panicked) = match attempt {
                Ok(Ok(title)) => {
                    tracing::debug!(task_id = %task.task_id, document_id, "Document updated");
                    (DocumentOutcome::succeeded(document_id, Some(title)), false)
                }
                Ok(Err(failure)) => {
                    tracing::warn!(
                        task_id = %task.task_id,
                        document_id,
                        failure = ?failure,
                        "Document update failed"
                    );
                    (failure.into_outcome(document_id), false)
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    tracing::error!(
                        task_id = %task.task_id,
                        document_id,
                        panic = %message,
                        "Document update panicked"
                    );
                    let error = format!("update panicked: {}", message);
                    (DocumentOutcome::failed(document_id, error, None), true)
                }
            };
            progress.record(outcome);

            if panicked {
                session = self.open_session().await?;
            }
        }

        let result = BatchResult::from_outcomes(task.total(), progress.outcomes());
        tracing::info!(
            task_id = %task.task_id,
            total = result.total,
            success = result.success,
            failed = result.failed,
            "Batch task executed"
        );
        Ok(result)
    }

    async fn open_session(&self) -> Result<Box<dyn DocumentSession>> {
        self.store
            .open_session()
            .await
            .context("Failed to open document session")
    }

    async fn update_document(
        &self,
        session: &mut dyn DocumentSession,
        task: &BatchTask,
        document_id: DocumentId,
    ) -> Result<String, DocumentFailure> {
        let mut document = session
            .find_document(document_id)
            .await
            .map_err(|error| DocumentFailure::Persistence { error, title: None })?
            .ok_or(DocumentFailure::NotFound)?;

        let report = self.validator.validate(&task.metadata_patch, true);
        if !report.valid {
            return Err(DocumentFailure::Invalid {
                errors: report.errors,
                title: document.display_title().to_string(),
            });
        }

        task.metadata_patch.apply_to(&mut document);
        document.updated_at = Utc::now();

        let audit = NewAuditRecord {
            document_id: document.id,
            user_id: Some(task.submitted_by),
            action: AUDIT_ACTION_BATCH_UPDATE.to_string(),
            description: audit_description(task),
            ip_address: Some(task.origin_address.clone()),
            user_agent: None,
        };

        let title = document.display_title().to_string();
        session
            .save(&document, &audit)
            .await
            .map_err(|error| DocumentFailure::Persistence {
                error,
                title: Some(title.clone()),
            })?;

        Ok(title)
    }
}
