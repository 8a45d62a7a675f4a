//! In-process registry of batch task status.
//!
//! Every read and write goes through one mutex so a task's status and result are
//! always observed together. The lock is never held across an `.await`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use docket_core::models::{BatchResult, TaskCounts, TaskState, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("task {0} is already registered")]
    DuplicateTask(String),
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, TaskStatus>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TaskStatus>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new `queued` record.
    pub fn register(
        &self,
        task_id: &str,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let mut tasks = self.lock();
        if tasks.contains_key(task_id) {
            return Err(RegistryError::DuplicateTask(task_id.to_string()));
        }
        tasks.insert(task_id.to_string(), TaskStatus::queued(submitted_at));
        Ok(())
    }

    /// Move a task to `state`. Unknown ids and transitions the state machine does not
    /// allow are logged and ignored.
    pub fn set_status(&self, task_id: &str, state: TaskState) {
        let mut tasks = self.lock();
        let Some(entry) = tasks.get_mut(task_id) else {
            tracing::warn!(task_id = %task_id, state = %state, "Status update for unknown task ignored");
            return;
        };

        if !entry.status.can_transition_to(state) {
            tracing::warn!(
                task_id = %task_id,
                from = %entry.status,
                to = %state,
                "Invalid task state transition ignored"
            );
            return;
        }

        entry.status = state;
        entry.updated_at = Some(Utc::now());
    }

    /// Attach a result without changing the task state.
    pub fn set_result(&self, task_id: &str, result: BatchResult) {
        let mut tasks = self.lock();
        match tasks.get_mut(task_id) {
            Some(entry) => entry.result = Some(result),
            None => {
                tracing::warn!(task_id = %task_id, "Result for unknown task ignored");
            }
        }
    }

    /// Move a task to a terminal `state` and attach its result in one step.
    pub fn finish(&self, task_id: &str, state: TaskState, result: BatchResult) {
        let mut tasks = self.lock();
        let Some(entry) = tasks.get_mut(task_id) else {
            tracing::warn!(task_id = %task_id, "Finish for unknown task ignored");
            return;
        };

        if !state.is_terminal() || !entry.status.can_transition_to(state) {
            tracing::warn!(
                task_id = %task_id,
                from = %entry.status,
                to = %state,
                "Invalid task completion ignored"
            );
            return;
        }

        entry.status = state;
        entry.result = Some(result);
        entry.updated_at = Some(Utc::now());
    }

    /// Forget a task entirely.
    pub fn remove(&self, task_id: &str) -> Option<TaskStatus> {
        self.lock().remove(task_id)
    }

    pub fn get(&self, task_id: &str) -> Option<TaskStatus> {
        self.lock().get(task_id).cloned()
    }

    /// Drop terminal records last updated before `cutoff`. Returns how many were removed.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|_, status| {
            !(status.is_terminal() && status.updated_at.unwrap_or(status.submitted_at) < cutoff)
        });
        before - tasks.len()
    }

    pub fn counts(&self) -> TaskCounts {
        let tasks = self.lock();
        let mut counts = TaskCounts::default();
        for status in tasks.values() {
            counts.record(status.status);
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
