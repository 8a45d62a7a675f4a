//! Fixed-size pool of batch workers.
//!
//! Each worker loops: dequeue (waiting at most the poll interval), mark the task
//! `processing`, run it on its own tokio task and record the outcome. A failing,
//! panicking or timed-out task marks only that task `failed`; the worker keeps going.
//! Documents finished before such a failure are still listed in the task result.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use docket_core::models::{BatchResult, BatchTask, TaskState};

use crate::executor::{panic_message, BatchExecutor, TaskProgress};
use crate::queue::{Dequeued, TaskDoneGuard, TaskQueue};
use crate::registry::TaskRegistry;

#[derive(Clone, Debug)]
pub struct WorkerPoolConfig {
    pub workers: usize,
    pub poll_interval: Duration,
    pub task_timeout: Option<Duration>,
}

pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

struct Worker {
    id: usize,
    queue: Arc<TaskQueue>,
    registry: Arc<TaskRegistry>,
    executor: BatchExecutor,
    poll_interval: Duration,
    task_timeout: Option<Duration>,
}

impl WorkerPool {
    /// Spawn `config.workers` worker loops on the current tokio runtime.
    pub fn start(
        config: WorkerPoolConfig,
        queue: Arc<TaskQueue>,
        registry: Arc<TaskRegistry>,
        executor: BatchExecutor,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = (0..config.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: queue.clone(),
                    registry: registry.clone(),
                    executor: executor.clone(),
                    poll_interval: config.poll_interval,
                    task_timeout: config.task_timeout,
                };
                tokio::spawn(worker.run(shutdown_rx.clone()))
            })
            .collect();

        tracing::info!(
            workers = config.workers,
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            task_timeout_secs = ?config.task_timeout.map(|t| t.as_secs()),
            "Batch worker pool started"
        );

        Self {
            shutdown_tx,
            handles,
        }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Signal every worker to stop and wait for them to exit. A worker busy with a task
    /// finishes that task first.
    pub async fn shutdown(self) {
        tracing::info!("Initiating batch worker pool shutdown");
        let _ = self.shutdown_tx.send(true);

        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Batch worker exited abnormally");
            }
        }

        tracing::info!("Batch worker pool stopped");
    }
}

impl Worker {
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!(worker = self.id, "Batch worker started");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let dequeued = tokio::select! {
                _ = shutdown_rx.changed() => break,
                dequeued = self.queue.dequeue(self.poll_interval) => dequeued,
            };

            match dequeued {
                Dequeued::Task(task) => {
                    let _done = TaskDoneGuard::new(&self.queue);
                    self.process(task).await;
                }
                Dequeued::Empty => continue,
                Dequeued::Closed => {
                    tracing::debug!(worker = self.id, "Task queue closed and drained");
                    break;
                }
            }
        }

        tracing::info!(worker = self.id, "Batch worker stopped");
    }

    #[tracing::instrument(skip(self, task), fields(worker = self.id, task_id = %task.task_id))]
    async fn process(&self, task: BatchTask) {
        let task_id = task.task_id.clone();
        let total = task.total();
        self.registry.set_status(&task_id, TaskState::Processing);

        let executor = self.executor.clone();
        let progress = TaskProgress::new();
        let recorder = progress.clone();
        let mut handle =
            tokio::spawn(async move { executor.execute_with_progress(&task, &recorder).await });

        let joined = match self.task_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    tracing::error!(
                        task_id = %task_id,
                        timeout_secs = limit.as_secs(),
                        "Batch task timed out"
                    );
                    let error = format!("task timed out after {}s", limit.as_secs());
                    self.registry.finish(
                        &task_id,
                        TaskState::Failed,
                        BatchResult::interrupted(total, progress.outcomes(), error),
                    );
                    return;
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(result)) => {
                tracing::info!(
                    task_id = %task_id,
                    success = result.success,
                    total = result.total,
                    "Batch task completed"
                );
                self.registry.finish(&task_id, TaskState::Completed, result);
            }
            Ok(Err(e)) => {
                let error = format!("{:#}", e);
                tracing::error!(task_id = %task_id, error = %error, "Batch task failed");
                self.registry.finish(
                    &task_id,
                    TaskState::Failed,
                    BatchResult::interrupted(total, progress.outcomes(), error),
                );
            }
            Err(join_error) => {
                let error = join_error_message(join_error);
                tracing::error!(task_id = %task_id, error = %error, "Batch task aborted");
                self.registry.finish(
                    &task_id,
                    TaskState::Failed,
                    BatchResult::interrupted(total, progress.outcomes(), error),
                );
            }
        }
    }
}

fn join_error_message(error: JoinError) -> String {
    if error.is_panic() {
        format!("task panicked: {}", panic_message(error.into_panic()))
    } else {
        "task was cancelled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(42_u8)), "unknown panic");
    }

    #[tokio::test]
    async fn cancelled_join_error_is_reported() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        handle.abort();
        let error = handle.await.unwrap_err();
        assert_eq!(join_error_message(error), "task was cancelled");
    }
}
