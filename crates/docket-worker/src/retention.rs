//! Periodic eviction of finished task records.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::registry::TaskRegistry;

pub struct RetentionSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RetentionSweeper {
    /// Every `interval`, drop terminal records older than `retention`.
    ///
    /// Returns `None` when `retention` cannot be represented as a calendar duration,
    /// in which case records are kept.
    pub fn spawn(
        registry: Arc<TaskRegistry>,
        retention: Duration,
        interval: Duration,
    ) -> Option<Self> {
        let retention = match chrono::Duration::from_std(retention) {
            Ok(retention) => retention,
            Err(e) => {
                tracing::warn!(error = %e, "Task retention out of range, keeping finished tasks");
                return None;
            }
        };

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = registry.evict_finished_before(Utc::now() - retention);
                        if evicted > 0 {
                            tracing::debug!(evicted, "Evicted finished batch tasks");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        tracing::info!(
            retention_secs = retention.num_seconds(),
            sweep_interval_secs = interval.as_secs(),
            "Task retention sweeper started"
        );

        Some(Self {
            shutdown_tx,
            handle,
        })
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Task retention sweeper exited abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::models::{BatchResult, TaskState};

    #[tokio::test]
    async fn sweeper_evicts_expired_tasks() {
        let registry = Arc::new(TaskRegistry::new());
        registry.register("old", Utc::now()).unwrap();
        registry.set_status("old", TaskState::Processing);
        registry.finish("old", TaskState::Completed, BatchResult::from_outcomes(0, vec![]));
        registry.register("waiting", Utc::now()).unwrap();

        let sweeper = RetentionSweeper::spawn(
            registry.clone(),
            Duration::from_millis(10),
            Duration::from_millis(20),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        sweeper.stop().await;

        assert!(registry.get("old").is_none());
        assert!(registry.get("waiting").is_some());
    }
}
