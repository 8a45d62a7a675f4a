//! Batch engine facade: submission, status lookup and worker lifecycle.

use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use docket_core::models::{
    BatchResult, BatchTask, DocumentId, MetadataPatch, TaskCounts, TaskState, TaskStatus, UserId,
};
use docket_core::{AppError, BatchConfig, MetadataValidator};
use docket_db::DocumentStore;

use crate::executor::BatchExecutor;
use crate::pool::{WorkerPool, WorkerPoolConfig};
use crate::queue::TaskQueue;
use crate::registry::{RegistryError, TaskRegistry};
use crate::retention::RetentionSweeper;

/// A request to apply one metadata patch to a set of documents.
#[derive(Debug, Clone)]
pub struct SubmitBatch {
    pub document_ids: Vec<DocumentId>,
    pub metadata_patch: MetadataPatch,
    pub submitted_by: UserId,
    pub origin_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("document_ids must not be empty")]
    EmptyBatch,

    #[error("batch contains {count} documents, maximum is {max}")]
    TooManyDocuments { count: usize, max: usize },

    #[error("metadata must set at least one field")]
    EmptyPatch,

    #[error("task {0} already exists")]
    DuplicateTask(String),

    #[error("batch engine is not accepting new tasks")]
    QueueClosed,
}

impl From<RegistryError> for SubmitError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateTask(id) => SubmitError::DuplicateTask(id),
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::EmptyBatch | SubmitError::EmptyPatch => {
                AppError::InvalidInput(err.to_string())
            }
            SubmitError::TooManyDocuments { count, max } => {
                AppError::BatchTooLarge { count, max }
            }
            SubmitError::DuplicateTask(_) => AppError::Conflict(err.to_string()),
            SubmitError::QueueClosed => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}

enum Lifecycle {
    Idle,
    Running {
        pool: WorkerPool,
        sweeper: Option<RetentionSweeper>,
    },
    Stopped,
}

/// Accepts batch metadata tasks and runs them on a pool of background workers.
///
/// Construct once at startup, call [`BatchEngine::start`], share behind an `Arc`, and
/// call [`BatchEngine::stop`] on shutdown. Tasks submitted before `start` wait in the
/// queue.
pub struct BatchEngine {
    config: BatchConfig,
    registry: Arc<TaskRegistry>,
    queue: Arc<TaskQueue>,
    executor: BatchExecutor,
    lifecycle: Mutex<Lifecycle>,
}

impl BatchEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        validator: Arc<dyn MetadataValidator>,
        config: BatchConfig,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(TaskRegistry::new()),
            queue: Arc::new(TaskQueue::new()),
            executor: BatchExecutor::new(store, validator),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Spawn the worker pool and the retention sweeper. Must be called from within a
    /// tokio runtime. Calling it again is a no-op.
    pub fn start(&self) {
        let mut lifecycle = self
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running { .. } => {
                tracing::debug!("Batch engine already started");
                return;
            }
            Lifecycle::Stopped => {
                tracing::warn!("Batch engine was stopped and cannot be restarted");
                return;
            }
        }

        let pool = WorkerPool::start(
            WorkerPoolConfig {
                workers: self.config.workers,
                poll_interval: self.config.poll_interval(),
                task_timeout: self.config.task_timeout(),
            },
            self.queue.clone(),
            self.registry.clone(),
            self.executor.clone(),
        );

        let sweeper = self.config.task_retention().and_then(|retention| {
            RetentionSweeper::spawn(
                self.registry.clone(),
                retention,
                self.config.retention_sweep_interval(),
            )
        });

        let workers = pool.size();
        *lifecycle = Lifecycle::Running { pool, sweeper };
        tracing::info!(
            workers,
            max_documents = self.config.max_documents,
            "Batch engine started"
        );
    }

    /// Stop accepting tasks, give queued work up to the configured grace period to
    /// finish, then stop the workers. Tasks still queued afterwards are marked failed.
    pub async fn stop(&self) {
        self.queue.close();

        let previous = {
            let mut lifecycle = self
                .lifecycle
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        };

        if let Lifecycle::Running { pool, sweeper } = previous {
            let grace = self.config.shutdown_grace();
            if !grace.is_zero() && self.queue.pending() > 0 {
                tracing::info!(
                    pending = self.queue.pending(),
                    grace_secs = grace.as_secs(),
                    "Waiting for queued batch tasks"
                );
                if tokio::time::timeout(grace, self.queue.join()).await.is_err() {
                    tracing::warn!(
                        pending = self.queue.pending(),
                        "Shutdown grace period elapsed with batch tasks outstanding"
                    );
                }
            }

            pool.shutdown().await;
            if let Some(sweeper) = sweeper {
                sweeper.stop().await;
            }
        }

        for task in self.queue.drain().await {
            tracing::warn!(task_id = %task.task_id, "Batch task abandoned at shutdown");
            self.registry.finish(
                &task.task_id,
                TaskState::Failed,
                BatchResult::engine_failure(
                    task.total(),
                    "engine stopped before the task was processed",
                ),
            );
        }

        tracing::info!("Batch engine stopped");
    }

    /// Queue a batch under a freshly generated task id.
    pub fn submit(&self, request: SubmitBatch) -> Result<String, SubmitError> {
        self.submit_with_id(Uuid::new_v4().to_string(), request)
    }

    /// Queue a batch under a caller-supplied task id. Returns once the task is
    /// registered as `queued`; processing happens in the background.
    #[tracing::instrument(skip(self, request), fields(documents = request.document_ids.len()))]
    pub fn submit_with_id(
        &self,
        task_id: String,
        request: SubmitBatch,
    ) -> Result<String, SubmitError> {
        if request.document_ids.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }
        if request.document_ids.len() > self.config.max_documents {
            return Err(SubmitError::TooManyDocuments {
                count: request.document_ids.len(),
                max: self.config.max_documents,
            });
        }
        if request.metadata_patch.is_empty() {
            return Err(SubmitError::EmptyPatch);
        }
        if self.queue.is_closed() {
            return Err(SubmitError::QueueClosed);
        }

        let task = BatchTask::new(
            task_id.clone(),
            request.document_ids,
            request.metadata_patch,
            request.submitted_by,
            request.origin_address,
        );
        let total = task.total();

        self.registry.register(&task_id, task.submitted_at)?;
        if let Err(e) = self.queue.enqueue(task) {
            self.registry.remove(&task_id);
            tracing::warn!(task_id = %task_id, error = %e, "Batch task rejected");
            return Err(SubmitError::QueueClosed);
        }

        tracing::info!(task_id = %task_id, documents = total, "Batch task queued");
        Ok(task_id)
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.registry.get(task_id)
    }

    pub fn counts(&self) -> TaskCounts {
        self.registry.counts()
    }

    /// Tasks queued or running.
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    pub fn is_running(&self) -> bool {
        matches!(
            *self
                .lifecycle
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            Lifecycle::Running { .. }
        )
    }

    pub fn max_documents(&self) -> usize {
        self.config.max_documents
    }
}
