//! FIFO queue of batch tasks shared by all workers.
//!
//! Enqueueing never blocks. Consumers take turns on the receiver, so tasks are handed
//! out in submission order. The queue counts outstanding tasks: each dequeued task
//! must be acknowledged with [`TaskQueue::task_done`], and [`TaskQueue::join`] waits
//! until every enqueued task has been acknowledged.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};
use tokio::time::{timeout_at, Instant};

use docket_core::models::BatchTask;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("task queue is closed")]
    Closed,
}

/// Outcome of a [`TaskQueue::dequeue`] call.
#[derive(Debug)]
pub enum Dequeued {
    Task(BatchTask),
    /// Nothing arrived within the wait.
    Empty,
    /// The queue was closed and fully drained.
    Closed,
}

pub struct TaskQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<BatchTask>>>,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<BatchTask>>,
    pending: AtomicUsize,
    idle: Notify,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: AsyncMutex::new(rx),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub fn enqueue(&self, task: BatchTask) -> Result<(), QueueError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            return Err(QueueError::Closed);
        };

        self.pending.fetch_add(1, Ordering::SeqCst);
        if tx.send(task).is_err() {
            self.acknowledge();
            return Err(QueueError::Closed);
        }
        Ok(())
    }

    /// Wait up to `wait` for the next task.
    pub async fn dequeue(&self, wait: Duration) -> Dequeued {
        let deadline = Instant::now() + wait;

        let mut receiver = match timeout_at(deadline, self.receiver.lock()).await {
            Ok(receiver) => receiver,
            Err(_) => return Dequeued::Empty,
        };

        match timeout_at(deadline, receiver.recv()).await {
            Ok(Some(task)) => Dequeued::Task(task),
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::Empty,
        }
    }

    /// Acknowledge one dequeued task.
    pub fn task_done(&self) {
        self.acknowledge();
    }

    fn acknowledge(&self) {
        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match previous {
            Ok(1) => self.idle.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::warn!("task_done called more times than tasks were enqueued"),
        }
    }

    /// Wait until every enqueued task has been acknowledged.
    pub async fn join(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Remove and acknowledge every task still waiting in the queue.
    pub async fn drain(&self) -> Vec<BatchTask> {
        let mut receiver = self.receiver.lock().await;
        let mut drained = Vec::new();
        while let Ok(task) = receiver.try_recv() {
            drained.push(task);
            self.acknowledge();
        }
        drained
    }

    /// Stop accepting tasks. Tasks already queued can still be dequeued.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Tasks enqueued but not yet acknowledged.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Acknowledges a dequeued task when dropped, whatever happened to it.
pub(crate) struct TaskDoneGuard<'a> {
    queue: &'a TaskQueue,
}

impl<'a> TaskDoneGuard<'a> {
    pub(crate) fn new(queue: &'a TaskQueue) -> Self {
        Self { queue }
    }
}

impl Drop for TaskDoneGuard<'_> {
    fn drop(&mut self) {
        self.queue.task_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::models::MetadataPatch;
    use std::sync::Arc;

    fn task(id: &str) -> BatchTask {
        BatchTask::new(id, vec![1], MetadataPatch::default(), 1, "127.0.0.1")
    }

    fn task_id(dequeued: Dequeued) -> String {
        match dequeued {
            Dequeued::Task(task) => task.task_id,
            other => panic!("expected a task, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dequeues_in_submission_order() {
        let queue = TaskQueue::new();
        for id in ["a", "b", "c"] {
            queue.enqueue(task(id)).unwrap();
        }

        let wait = Duration::from_millis(50);
        assert_eq!(task_id(queue.dequeue(wait).await), "a");
        assert_eq!(task_id(queue.dequeue(wait).await), "b");
        assert_eq!(task_id(queue.dequeue(wait).await), "c");
        assert!(matches!(queue.dequeue(wait).await, Dequeued::Empty));
    }

    #[tokio::test]
    async fn closed_queue_rejects_and_drains() {
        let queue = TaskQueue::new();
        queue.enqueue(task("a")).unwrap();
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(task("b")), Err(QueueError::Closed));

        let wait = Duration::from_millis(50);
        assert_eq!(task_id(queue.dequeue(wait).await), "a");
        assert!(matches!(queue.dequeue(wait).await, Dequeued::Closed));
    }

    #[tokio::test]
    async fn join_waits_for_acknowledgement() {
        let queue = Arc::new(TaskQueue::new());
        queue.enqueue(task("a")).unwrap();
        queue.enqueue(task("b")).unwrap();
        assert_eq!(queue.pending(), 2);

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move {
                for _ in 0..2 {
                    if let Dequeued::Task(_) = queue.dequeue(Duration::from_secs(1)).await {
                        let _done = TaskDoneGuard::new(&queue);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            })
        };

        tokio::time::timeout(Duration::from_secs(2), queue.join())
            .await
            .expect("join should return once both tasks are acknowledged");
        assert_eq!(queue.pending(), 0);
        consumer.await.unwrap();
    }

    #[tokio::test]
    async fn drain_empties_and_acknowledges() {
        let queue = TaskQueue::new();
        queue.enqueue(task("a")).unwrap();
        queue.enqueue(task("b")).unwrap();
        queue.close();

        let drained = queue.drain().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(queue.pending(), 0);
        assert!(matches!(
            queue.dequeue(Duration::from_millis(10)).await,
            Dequeued::Closed
        ));
    }

    #[tokio::test]
    async fn join_returns_immediately_when_idle() {
        let queue = TaskQueue::new();
        tokio::time::timeout(Duration::from_millis(100), queue.join())
            .await
            .unwrap();
    }
}
