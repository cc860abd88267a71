use super::{JobQueue, QueueError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch, Mutex};
use uuid::Uuid;

/// In-process queue for single-process runs and tests
pub struct MemoryJobQueue {
    sender: mpsc::UnboundedSender<Uuid>,
    receiver: Mutex<mpsc::UnboundedReceiver<Uuid>>,
    connected: AtomicBool,
    closed: watch::Sender<bool>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            connected: AtomicBool::new(false),
            closed,
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn check_open(&self) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(QueueError::NotConnected);
        }
        Ok(())
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(backend = "memory", "Job queue connected");
        Ok(())
    }

    async fn close(&self) {
        self.closed.send_replace(true);
        tracing::info!(backend = "memory", "Job queue closed");
    }

    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        self.check_open()?;
        self.sender.send(job_id).map_err(|_| QueueError::Closed)?;
        tracing::debug!(job_id = %job_id, "Job enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Uuid>, QueueError> {
        if !self.connected.load(Ordering::SeqCst) && !self.is_closed() {
            return Err(QueueError::NotConnected);
        }

        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Ok(None);
        }

        // Only one waiter holds the receiver at a time; the others queue on the lock
        let mut receiver = tokio::select! {
            guard = self.receiver.lock() => guard,
            _ = closed.wait_for(|closed| *closed) => return Ok(None),
        };

        tokio::select! {
            job_id = receiver.recv() => Ok(job_id),
            _ = closed.wait_for(|closed| *closed) => Ok(None),
        }
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.is_closed()
    }
}
