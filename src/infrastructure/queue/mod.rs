//! Job queue clients.
//!
//! The queue only carries job ids. Delivery is at-least-once: a job id may
//! be handed out more than once (e.g. re-enqueued on startup), and the job
//! runner's claim on the job record decides who actually processes it.

mod memory;
mod postgres;

pub use memory::MemoryJobQueue;
pub use postgres::PgJobQueue;

use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,
    #[error("queue is not connected")]
    NotConnected,
    #[error("queue backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Short backend name used in logs and readiness output
    fn backend_name(&self) -> &'static str;

    /// Prepare the backend. Must be called before `enqueue`/`dequeue`.
    async fn connect(&self) -> Result<(), QueueError>;

    /// Stop handing out jobs. Blocked `dequeue` calls return `Ok(None)`.
    async fn close(&self);

    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError>;

    /// Wait for the next job id; `Ok(None)` once the queue is closed
    async fn dequeue(&self) -> Result<Option<Uuid>, QueueError>;

    /// Whether the queue is connected and not closed
    fn is_ready(&self) -> bool;
}
