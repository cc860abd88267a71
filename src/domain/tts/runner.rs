use super::assembler::{assemble, mp3_duration_seconds};
use super::chunker::Chunker;
use super::error::SynthesisError;
use super::model::{JobStatus, StatusUpdate, TtsJob};
use super::ssml::chunker_for;
use super::text::clean_text;
use super::voice::VoiceConfig;
use crate::error::AppError;
use crate::infrastructure::repositories::{TtsJobRepository, TtsRepository};
use crate::infrastructure::storage::AudioStorage;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const CHARACTERS_PER_MINUTE: usize = 1000;

/// Estimated playback length of `char_count` characters of speech, used
/// when the assembled audio cannot be measured
pub fn estimate_duration_seconds(char_count: usize) -> i32 {
    (char_count * 60 / CHARACTERS_PER_MINUTE) as i32
}

/// Bounded exponential backoff for transient synthesis errors
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// What happened to a dequeued job id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
    Cancelled,
    /// Job missing or already claimed; nothing was done
    Skipped,
}

/// Why a run stopped before completing
enum Stop {
    Cancelled,
    Failed(String),
    Store(AppError),
}

/// Drives one job from pending to a terminal status.
///
/// Chunks are synthesized strictly in order. Cancellation is checked before
/// every chunk and once more before assembly; a provider call in flight is
/// never interrupted.
pub struct JobRunner {
    jobs: Arc<dyn TtsJobRepository>,
    synthesizer: Arc<dyn TtsRepository>,
    storage: AudioStorage,
    chunker: Chunker,
    retry: RetryPolicy,
    synthesis_timeout: Duration,
    cache: Option<Cache<String, Vec<u8>>>,
}

impl JobRunner {
    pub fn new(
        jobs: Arc<dyn TtsJobRepository>,
        synthesizer: Arc<dyn TtsRepository>,
        storage: AudioStorage,
        chunker: Chunker,
        retry: RetryPolicy,
        synthesis_timeout: Duration,
        cache_enabled: bool,
    ) -> Self {
        let cache = if cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(1000)
                    .time_to_idle(Duration::from_secs(30 * 60)) // 30 minutes, refreshes on access
                    .build(),
            )
        } else {
            None
        };

        Self {
            jobs,
            synthesizer,
            storage,
            chunker,
            retry,
            synthesis_timeout,
            cache,
        }
    }

    /// Process a dequeued job id.
    ///
    /// Returns `Skipped` when the job is gone or another worker already
    /// claimed it, which makes duplicate deliveries harmless.
    pub async fn process(&self, job_id: Uuid) -> Result<RunOutcome, AppError> {
        let job = match self.jobs.find_by_id(job_id).await? {
            Some(job) => job,
            None => {
                tracing::debug!(job_id = %job_id, "Job no longer exists, skipping");
                return Ok(RunOutcome::Skipped);
            }
        };

        if job.status != JobStatus::Pending {
            tracing::debug!(job_id = %job_id, status = %job.status, "Job not pending, skipping");
            return Ok(RunOutcome::Skipped);
        }

        let claimed = self
            .jobs
            .transition(job_id, &[JobStatus::Pending], StatusUpdate::Processing)
            .await?;
        if !claimed {
            tracing::debug!(job_id = %job_id, "Job claimed elsewhere or cancelled, skipping");
            return Ok(RunOutcome::Skipped);
        }

        let start_time = Instant::now();
        tracing::info!(
            job_id = %job_id,
            voice = %job.voice,
            text_length = job.text.len(),
            total_chunks = job.total_chunks,
            "Job processing started"
        );

        match self.run(&job).await {
            Ok(()) => {
                tracing::info!(
                    job_id = %job_id,
                    latency_ms = start_time.elapsed().as_millis(),
                    "Job completed"
                );
                Ok(RunOutcome::Completed)
            }
            Err(Stop::Cancelled) => {
                tracing::info!(job_id = %job_id, "Job cancelled, stopping");
                Ok(RunOutcome::Cancelled)
            }
            Err(Stop::Failed(message)) => self.fail(job_id, message).await,
            Err(Stop::Store(err)) => {
                if let Err(e) = self.fail(job_id, "internal storage error".to_string()).await {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to record job failure");
                }
                Err(err)
            }
        }
    }

    async fn fail(&self, job_id: Uuid, error_message: String) -> Result<RunOutcome, AppError> {
        tracing::error!(job_id = %job_id, error = %error_message, "Job failed");

        let recorded = self
            .jobs
            .transition(
                job_id,
                &[JobStatus::Processing],
                StatusUpdate::Failed { error_message },
            )
            .await?;

        if recorded {
            Ok(RunOutcome::Failed)
        } else {
            // Cancelled while the failing step was running
            Ok(RunOutcome::Cancelled)
        }
    }

    async fn run(&self, job: &TtsJob) -> Result<(), Stop> {
        let voice = VoiceConfig::parse(&job.voice, &job.rate, &job.pitch)
            .map_err(|e| Stop::Failed(e.to_string()))?
            .with_preset(job.ssml_preset);
        let text = clean_text(&job.text);
        let chunks = chunker_for(self.chunker, job.ssml_preset, self.synthesizer.max_chunk_chars())
            .split(&text)
            .map_err(|e| Stop::Failed(e.to_string()))?;
        let total = chunks.len();

        let mut audio = Vec::with_capacity(total);
        for chunk in &chunks {
            self.ensure_not_cancelled(job.id).await?;

            let bytes = self
                .synthesize_chunk(job.id, chunk.index(), chunk.as_str(), &voice)
                .await
                .map_err(|e| {
                    Stop::Failed(format!("chunk {} of {}: {}", chunk.index() + 1, total, e))
                })?;
            audio.push(bytes);

            self.jobs
                .update_progress(job.id, (chunk.index() + 1) as i32)
                .await
                .map_err(Stop::Store)?;
        }

        self.ensure_not_cancelled(job.id).await?;

        let assembled = assemble(&audio).map_err(|e| Stop::Failed(e.to_string()))?;
        let output_path = self
            .storage
            .write_job_audio(job.id, &assembled)
            .await
            .map_err(|e| Stop::Failed(format!("failed to store audio: {}", e)))?;

        let update = StatusUpdate::Completed {
            output_path: output_path.clone(),
            file_size_bytes: assembled.len() as i64,
            duration_seconds: mp3_duration_seconds(&assembled)
                .map(|seconds| seconds.round() as i32)
                .unwrap_or_else(|| estimate_duration_seconds(text.chars().count())),
        };

        match self
            .jobs
            .transition(job.id, &[JobStatus::Processing], update)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.discard_output(job.id, &output_path).await;
                Err(Stop::Cancelled)
            }
            Err(e) => {
                self.discard_output(job.id, &output_path).await;
                Err(Stop::Store(e))
            }
        }
    }

    async fn discard_output(&self, job_id: Uuid, output_path: &str) {
        if let Err(e) = self.storage.delete(output_path).await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to discard job audio");
        }
    }

    async fn ensure_not_cancelled(&self, job_id: Uuid) -> Result<(), Stop> {
        match self.jobs.find_by_id(job_id).await.map_err(Stop::Store)? {
            Some(job) if job.status == JobStatus::Processing => Ok(()),
            _ => Err(Stop::Cancelled),
        }
    }

    async fn synthesize_chunk(
        &self,
        job_id: Uuid,
        index: usize,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<Vec<u8>, SynthesisError> {
        let preset = voice.preset.map_or("", |p| p.as_str());
        let cache_key = format!(
            "{}|{}|{}|{}|{}",
            voice.voice, voice.rate, voice.pitch, preset, text
        );
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&cache_key).await {
                tracing::debug!(
                    job_id = %job_id,
                    chunk_index = index,
                    cached_audio_size = cached.len(),
                    "TTS cache hit - reusing chunk audio"
                );
                return Ok(cached);
            }
        }

        let mut attempt = 1;
        loop {
            let result =
                match tokio::time::timeout(self.synthesis_timeout, self.synthesizer.synthesize(text, voice))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(SynthesisError::Timeout(format!(
                        "no response within {:?}",
                        self.synthesis_timeout
                    ))),
                };

            match result {
                Ok(bytes) => {
                    tracing::debug!(
                        job_id = %job_id,
                        chunk_index = index,
                        attempt = attempt,
                        audio_size_bytes = bytes.len(),
                        "Chunk synthesized"
                    );
                    if let Some(cache) = &self.cache {
                        cache.insert(cache_key, bytes.clone()).await;
                    }
                    return Ok(bytes);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff_for(attempt);
                    tracing::warn!(
                        job_id = %job_id,
                        chunk_index = index,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient synthesis error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
