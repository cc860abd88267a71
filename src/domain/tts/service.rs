use super::chunker::Chunker;
use super::dto::{CreateTtsJobRequest, ListTtsJobsQuery, TaskStatusResponse, TtsJobResponse};
use super::error::TtsServiceError;
use super::model::{JobFilter, JobStatus, StatusUpdate, TtsJob};
use super::ssml::{chunker_for, SsmlPreset};
use super::text::clean_text;
use super::voice::VoiceConfig;
use crate::infrastructure::queue::JobQueue;
use crate::infrastructure::repositories::{TtsJobRepository, TtsRepository};
use crate::infrastructure::storage::{AudioStorage, StorageError};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 100;

/// Submission-time settings
#[derive(Debug, Clone)]
pub struct SubmissionSettings {
    pub max_text_chars: usize,
    pub default_rate: String,
    pub default_pitch: String,
}

pub struct TtsJobService {
    jobs: Arc<dyn TtsJobRepository>,
    queue: Arc<dyn JobQueue>,
    synthesizer: Arc<dyn TtsRepository>,
    storage: AudioStorage,
    chunker: Chunker,
    settings: SubmissionSettings,
}

impl TtsJobService {
    pub fn new(
        jobs: Arc<dyn TtsJobRepository>,
        queue: Arc<dyn JobQueue>,
        synthesizer: Arc<dyn TtsRepository>,
        storage: AudioStorage,
        chunker: Chunker,
        settings: SubmissionSettings,
    ) -> Self {
        Self {
            jobs,
            queue,
            synthesizer,
            storage,
            chunker,
            settings,
        }
    }

    async fn find_job(&self, job_id: Uuid) -> Result<TtsJob, TtsServiceError> {
        self.jobs
            .find_by_id(job_id)
            .await
            .map_err(|e| TtsServiceError::Dependency(e.to_string()))?
            .ok_or(TtsServiceError::NotFound)
    }

    fn validate_voice(&self, request: &CreateTtsJobRequest) -> Result<VoiceConfig, TtsServiceError> {
        let voice = request
            .voice
            .as_deref()
            .unwrap_or_else(|| self.synthesizer.default_voice());
        let rate = request
            .rate
            .as_deref()
            .unwrap_or(&self.settings.default_rate);
        let pitch = request
            .pitch
            .as_deref()
            .unwrap_or(&self.settings.default_pitch);

        let preset = request
            .ssml_preset
            .as_deref()
            .map(str::parse::<SsmlPreset>)
            .transpose()?;

        let config = VoiceConfig::parse(voice, rate, pitch)?.with_preset(preset);
        if !self.synthesizer.supports_voice(&config.voice) {
            return Err(TtsServiceError::Invalid(format!(
                "voice '{}' is not supported by the {} provider",
                config.voice,
                self.synthesizer.provider_name()
            )));
        }
        Ok(config)
    }
}

#[async_trait]
pub trait TtsJobServiceApi: Send + Sync {
    /// Validate a submission, persist it as a pending job and enqueue it
    ///
    /// Invalid submissions are rejected before anything is persisted.
    async fn submit(&self, request: CreateTtsJobRequest) -> Result<TtsJobResponse, TtsServiceError>;

    async fn get_job(&self, job_id: Uuid) -> Result<TtsJobResponse, TtsServiceError>;

    async fn get_status(&self, job_id: Uuid) -> Result<TaskStatusResponse, TtsServiceError>;

    async fn list_jobs(&self, query: ListTtsJobsQuery) -> Result<Vec<TtsJobResponse>, TtsServiceError>;

    /// Request cancellation of a pending or processing job
    async fn cancel(&self, job_id: Uuid) -> Result<TtsJobResponse, TtsServiceError>;

    /// Delete a job record and its audio. Processing jobs cannot be deleted.
    async fn delete(&self, job_id: Uuid) -> Result<(), TtsServiceError>;

    /// Assembled audio of a completed job
    async fn get_audio(&self, job_id: Uuid) -> Result<Vec<u8>, TtsServiceError>;

    /// Re-enqueue jobs left pending by a previous run, returning how many
    async fn recover_pending(&self) -> Result<usize, TtsServiceError>;
}

#[async_trait]
impl TtsJobServiceApi for TtsJobService {
    async fn submit(&self, request: CreateTtsJobRequest) -> Result<TtsJobResponse, TtsServiceError> {
        if request.text.trim().is_empty() {
            return Err(TtsServiceError::Invalid("Text cannot be empty".to_string()));
        }

        let char_count = request.text.chars().count();
        if char_count > self.settings.max_text_chars {
            return Err(TtsServiceError::PayloadTooLarge(format!(
                "Text must be {} characters or less",
                self.settings.max_text_chars
            )));
        }

        let cleaned_text = clean_text(&request.text);
        if cleaned_text.is_empty() {
            return Err(TtsServiceError::Invalid(
                "Text has no speakable content".to_string(),
            ));
        }

        let voice = self.validate_voice(&request)?;
        let chunker = chunker_for(
            self.chunker,
            voice.preset,
            self.synthesizer.max_chunk_chars(),
        );
        let total_chunks = chunker.chunks(&cleaned_text)?.count();

        let job = TtsJob::new_pending(
            request.text,
            voice.voice.clone(),
            voice.rate.to_string(),
            voice.pitch.to_string(),
            total_chunks as i32,
        )
        .with_ssml_preset(voice.preset);

        self.jobs
            .create(&job)
            .await
            .map_err(|e| TtsServiceError::Dependency(e.to_string()))?;

        if let Err(e) = self.queue.enqueue(job.id).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to enqueue job, discarding it");
            if let Err(e) = self.jobs.delete(job.id, &[JobStatus::Pending]).await {
                tracing::error!(job_id = %job.id, error = %e, "Failed to discard unqueued job");
            }
            return Err(TtsServiceError::Dependency(format!(
                "failed to enqueue job: {}",
                e
            )));
        }

        tracing::info!(
            job_id = %job.id,
            voice = %job.voice,
            rate = %job.rate,
            pitch = %job.pitch,
            ssml_preset = ?job.ssml_preset,
            original_length = char_count,
            cleaned_length = cleaned_text.chars().count(),
            total_chunks = total_chunks,
            "TTS job submitted"
        );

        Ok(TtsJobResponse::from(job))
    }

    async fn get_job(&self, job_id: Uuid) -> Result<TtsJobResponse, TtsServiceError> {
        Ok(TtsJobResponse::from(self.find_job(job_id).await?))
    }

    async fn get_status(&self, job_id: Uuid) -> Result<TaskStatusResponse, TtsServiceError> {
        let job = self.find_job(job_id).await?;
        Ok(TaskStatusResponse::from(&job))
    }

    async fn list_jobs(&self, query: ListTtsJobsQuery) -> Result<Vec<TtsJobResponse>, TtsServiceError> {
        let filter = JobFilter {
            status: query.status,
            skip: query.skip.unwrap_or(0).max(0),
            limit: query
                .limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, MAX_LIST_LIMIT),
        };

        let jobs = self
            .jobs
            .list(&filter)
            .await
            .map_err(|e| TtsServiceError::Dependency(e.to_string()))?;

        Ok(jobs.into_iter().map(TtsJobResponse::from).collect())
    }

    async fn cancel(&self, job_id: Uuid) -> Result<TtsJobResponse, TtsServiceError> {
        let job = self.find_job(job_id).await?;
        if job.status.is_terminal() {
            return Err(TtsServiceError::Invalid(format!(
                "Task is already {}",
                job.status
            )));
        }

        let cancelled = self
            .jobs
            .transition(
                job_id,
                &JobStatus::predecessors_of(JobStatus::Cancelled),
                StatusUpdate::Cancelled,
            )
            .await
            .map_err(|e| TtsServiceError::Dependency(e.to_string()))?;

        let job = self.find_job(job_id).await?;
        if !cancelled {
            // Finished between the read and the write
            return Err(TtsServiceError::Invalid(format!(
                "Task is already {}",
                job.status
            )));
        }

        tracing::info!(job_id = %job_id, "TTS job cancelled");
        Ok(TtsJobResponse::from(job))
    }

    async fn delete(&self, job_id: Uuid) -> Result<(), TtsServiceError> {
        let job = self.find_job(job_id).await?;
        if job.status == JobStatus::Processing {
            return Err(TtsServiceError::Conflict(
                "Cannot delete a task while it is processing; cancel it first".to_string(),
            ));
        }

        let deletable: Vec<JobStatus> = JobStatus::ALL
            .into_iter()
            .filter(|status| *status != JobStatus::Processing)
            .collect();
        let deleted = self
            .jobs
            .delete(job_id, &deletable)
            .await
            .map_err(|e| TtsServiceError::Dependency(e.to_string()))?;

        if !deleted {
            return match self.find_job(job_id).await {
                Err(TtsServiceError::NotFound) => Err(TtsServiceError::NotFound),
                _ => Err(TtsServiceError::Conflict(
                    "Task started processing; cancel it first".to_string(),
                )),
            };
        }

        if let Some(output_path) = job.output_path {
            if let Err(e) = self.storage.delete(&output_path).await {
                tracing::warn!(job_id = %job_id, error = %e, "Failed to delete job audio");
            }
        }

        tracing::info!(job_id = %job_id, "TTS job deleted");
        Ok(())
    }

    async fn get_audio(&self, job_id: Uuid) -> Result<Vec<u8>, TtsServiceError> {
        let job = self.find_job(job_id).await?;
        if job.audio_expired_at.is_some() {
            return Err(TtsServiceError::AudioNotReady(
                "audio has expired".to_string(),
            ));
        }
        let output_path = match job.available_audio() {
            Some(path) => path,
            None => {
                return Err(TtsServiceError::AudioNotReady(format!(
                    "task is {}",
                    job.status
                )))
            }
        };

        self.storage.read(output_path).await.map_err(|e| match e {
            StorageError::NotFound(_) => {
                TtsServiceError::AudioNotReady("audio file is missing".to_string())
            }
            other => TtsServiceError::Dependency(other.to_string()),
        })
    }

    async fn recover_pending(&self) -> Result<usize, TtsServiceError> {
        let pending = self
            .jobs
            .pending_ids()
            .await
            .map_err(|e| TtsServiceError::Dependency(e.to_string()))?;

        for job_id in &pending {
            self.queue
                .enqueue(*job_id)
                .await
                .map_err(|e| TtsServiceError::Dependency(e.to_string()))?;
        }

        if !pending.is_empty() {
            tracing::info!(count = pending.len(), "Re-enqueued pending jobs");
        }
        Ok(pending.len())
    }
}
