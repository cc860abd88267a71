use super::runner::{JobRunner, RunOutcome};
use crate::infrastructure::queue::JobQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Pause after a queue backend error before polling again
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// N tokio tasks, each pulling job ids from the shared queue
pub struct WorkerPool {
    queue: Arc<dyn JobQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(queue: Arc<dyn JobQueue>, runner: Arc<JobRunner>, concurrency: usize) -> Self {
        tracing::info!(
            concurrency = concurrency,
            queue = queue.backend_name(),
            "Starting worker pool"
        );

        let workers = (0..concurrency)
            .map(|worker_id| {
                let queue = queue.clone();
                let runner = runner.clone();
                tokio::spawn(async move { worker_loop(worker_id, queue, runner).await })
            })
            .collect();

        Self { queue, workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue and wait for in-flight jobs to finish
    pub async fn shutdown(self) {
        tracing::info!(workers = self.workers.len(), "Shutting down worker pool");
        self.queue.close().await;

        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }

        tracing::info!("Worker pool stopped");
    }
}

async fn worker_loop(worker_id: usize, queue: Arc<dyn JobQueue>, runner: Arc<JobRunner>) {
    tracing::debug!(worker_id = worker_id, "Worker started");

    loop {
        let job_id = match queue.dequeue().await {
            Ok(Some(job_id)) => job_id,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(worker_id = worker_id, error = %e, "Failed to dequeue job");
                tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
                continue;
            }
        };

        match runner.process(job_id).await {
            Ok(RunOutcome::Skipped) => {}
            Ok(outcome) => {
                tracing::debug!(
                    worker_id = worker_id,
                    job_id = %job_id,
                    outcome = ?outcome,
                    "Job finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    worker_id = worker_id,
                    job_id = %job_id,
                    error = %e,
                    "Job processing error"
                );
            }
        }
    }

    tracing::debug!(worker_id = worker_id, "Worker stopped");
}
