use super::model::{JobStatus, StatusUpdate};
use crate::error::{AppError, AppResult};
use crate::infrastructure::repositories::TtsJobRepository;
use crate::infrastructure::storage::AudioStorage;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Error recorded on jobs whose worker went away mid-run
pub const INTERRUPTED_MESSAGE: &str = "worker interrupted before the job finished";

/// Completed jobs fetched per expiry round trip
const EXPIRY_BATCH: i64 = 100;

#[derive(Debug, Clone)]
pub struct HousekeepingSettings {
    /// How long the audio of a completed job is kept; `None` keeps it forever
    pub audio_retention: Option<Duration>,
    /// Processing jobs without progress for this long count as interrupted
    pub stale_after: Duration,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub interrupted_jobs: usize,
    pub expired_audio: usize,
}

/// Periodic maintenance of job records and their audio.
///
/// Processing jobs whose worker stopped reporting progress are failed, which
/// makes them deletable again. Completed jobs past the retention window lose
/// their audio file but keep their record. Saved audios are separate copies
/// and are never touched.
pub struct Housekeeper {
    jobs: Arc<dyn TtsJobRepository>,
    storage: AudioStorage,
    settings: HousekeepingSettings,
}

impl Housekeeper {
    pub fn new(
        jobs: Arc<dyn TtsJobRepository>,
        storage: AudioStorage,
        settings: HousekeepingSettings,
    ) -> Self {
        Self {
            jobs,
            storage,
            settings,
        }
    }

    pub async fn run_once(&self) -> AppResult<HousekeepingReport> {
        let interrupted_jobs = self.fail_interrupted(self.settings.stale_after).await?;
        let expired_audio = match self.settings.audio_retention {
            Some(retention) => self.expire_audio(retention).await?,
            None => 0,
        };

        Ok(HousekeepingReport {
            interrupted_jobs,
            expired_audio,
        })
    }

    /// Fail processing jobs with no progress for `stale_after`, returning
    /// how many were failed
    pub async fn fail_interrupted(&self, stale_after: Duration) -> AppResult<usize> {
        let cutoff = Utc::now() - to_chrono(stale_after)?;
        let stale = self.jobs.stale_processing_ids(cutoff).await?;

        let mut failed = 0;
        for job_id in stale {
            let recorded = self
                .jobs
                .transition(
                    job_id,
                    &[JobStatus::Processing],
                    StatusUpdate::Failed {
                        error_message: INTERRUPTED_MESSAGE.to_string(),
                    },
                )
                .await?;
            if recorded {
                tracing::warn!(job_id = %job_id, "Interrupted job marked as failed");
                failed += 1;
            }
        }

        Ok(failed)
    }

    /// Delete the audio of jobs completed more than `retention` ago,
    /// returning how many were expired
    pub async fn expire_audio(&self, retention: Duration) -> AppResult<usize> {
        let cutoff = Utc::now() - to_chrono(retention)?;

        let mut expired = 0;
        loop {
            let batch = self.jobs.expired_audio(cutoff, EXPIRY_BATCH).await?;
            let batch_len = batch.len() as i64;

            for job in batch {
                // Flag first: a job whose file is already gone must not look downloadable
                if !self.jobs.mark_audio_expired(job.id).await? {
                    continue;
                }
                if let Some(output_path) = job.output_path.as_deref() {
                    if let Err(e) = self.storage.delete(output_path).await {
                        tracing::warn!(job_id = %job.id, error = %e, "Failed to delete expired job audio");
                    }
                }
                expired += 1;
            }

            if batch_len < EXPIRY_BATCH {
                break;
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Expired job audio removed");
        }
        Ok(expired)
    }

    /// Run every `interval` until the returned task is shut down. The first
    /// run happens one interval from now.
    pub fn start(self: Arc<Self>) -> HousekeepingTask {
        let (shutdown, mut stop) = watch::channel(());
        let interval = self.settings.interval;

        tracing::info!(
            interval_secs = interval.as_secs(),
            stale_after_secs = self.settings.stale_after.as_secs(),
            audio_retention_secs = self.settings.audio_retention.map(|r| r.as_secs()),
            "Starting housekeeping"
        );

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    // Sender dropped
                    _ = stop.changed() => break,
                }

                match self.run_once().await {
                    Ok(report) if report != HousekeepingReport::default() => {
                        tracing::info!(
                            interrupted_jobs = report.interrupted_jobs,
                            expired_audio = report.expired_audio,
                            "Housekeeping run finished"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Housekeeping run failed"),
                }
            }

            tracing::debug!("Housekeeping stopped");
        });

        HousekeepingTask { handle, shutdown }
    }
}

/// Handle of the periodic housekeeping task
pub struct HousekeepingTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<()>,
}

impl HousekeepingTask {
    /// Stop the task, letting a run in progress finish
    pub async fn shutdown(self) {
        drop(self.shutdown);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Housekeeping task panicked");
        }
    }
}

fn to_chrono(duration: Duration) -> AppResult<chrono::Duration> {
    chrono::Duration::from_std(duration)
        .map_err(|e| AppError::Internal(format!("duration out of range: {}", e)))
}
