use super::{JobQueue, QueueError};
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

/// Queue backed by the `job_queue` table.
///
/// Entries are claimed with `FOR UPDATE SKIP LOCKED`, so any number of
/// worker processes can share one database. Idle consumers poll every
/// `poll_interval`; local enqueues wake them early.
pub struct PgJobQueue {
    pool: Arc<DbPool>,
    poll_interval: Duration,
    connected: AtomicBool,
    closed: AtomicBool,
    wakeup: Notify,
}

impl PgJobQueue {
    pub fn new(pool: Arc<DbPool>, poll_interval: Duration) -> Self {
        Self {
            pool,
            poll_interval,
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            wakeup: Notify::new(),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn claim_next(&self) -> Result<Option<Uuid>, QueueError> {
        let pool = self.pool.as_ref();
        let job_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            DELETE FROM job_queue
            WHERE id = (
                SELECT id
                FROM job_queue
                ORDER BY id
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING job_id
            "#,
        )
        .fetch_optional(pool)
        .await?;

        Ok(job_id)
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&self) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        let pool = self.pool.as_ref();
        sqlx::query("SELECT 1 FROM job_queue LIMIT 1")
            .fetch_optional(pool)
            .await?;
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(
            backend = "postgres",
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Job queue connected"
        );
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.wakeup.notify_waiters();
        tracing::info!(backend = "postgres", "Job queue closed");
    }

    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueueError::NotConnected);
        }

        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO job_queue (job_id, enqueued_at)
            VALUES ($1, NOW())
            "#,
        )
        .bind(job_id)
        .execute(pool)
        .await?;

        self.wakeup.notify_one();
        tracing::debug!(job_id = %job_id, "Job enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Uuid>, QueueError> {
        if !self.connected.load(Ordering::SeqCst) && !self.is_closed() {
            return Err(QueueError::NotConnected);
        }

        loop {
            // Register interest before checking, so a close in between is not missed
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_closed() {
                return Ok(None);
            }

            if let Some(job_id) = self.claim_next().await? {
                return Ok(Some(job_id));
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.is_closed()
    }
}
