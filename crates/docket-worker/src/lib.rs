//! Batch metadata engine
//!
//! Submissions are registered as `queued` in the [`TaskRegistry`], pushed onto the
//! [`TaskQueue`] and picked up by the [`WorkerPool`], which runs each one through the
//! [`BatchExecutor`]. [`BatchEngine`] ties these together behind a submit/status API.

pub mod engine;
pub mod executor;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod retention;

pub use engine::{BatchEngine, SubmitBatch, SubmitError};
pub use executor::{BatchExecutor, TaskProgress};
pub use pool::{WorkerPool, WorkerPoolConfig};
pub use queue::{Dequeued, QueueError, TaskQueue};
pub use registry::{RegistryError, TaskRegistry};
pub use retention::RetentionSweeper;
