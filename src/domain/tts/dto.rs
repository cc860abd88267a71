use super::model::{JobStatus, TtsJob};
use super::ssml::SsmlPreset;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request for POST /api/tts
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTtsJobRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    /// Delivery style name such as `BEDTIME_SOFT` or `NEWS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml_preset: Option<String>,
}

/// Query for GET /api/tts
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListTtsJobsQuery {
    pub status: Option<JobStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Response for job endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct TtsJobResponse {
    pub id: Uuid,
    pub text: String,
    pub voice: String,
    pub rate: String,
    pub pitch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssml_preset: Option<SsmlPreset>,
    pub status: JobStatus,
    /// Present while the audio of a completed job can be downloaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub total_chunks: i32,
    pub processed_chunks: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Playback length, measured from the MPEG frame headers of the
    /// assembled audio. Falls back to an estimate from the text length
    /// (1000 characters per minute) when the audio cannot be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_expired_at: Option<DateTime<Utc>>,
}

/// Response for GET /api/tts/:id/status
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: Uuid,
    pub status: JobStatus,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

pub fn audio_url(job_id: Uuid) -> String {
    format!("/api/tts/{}/audio", job_id)
}

impl From<TtsJob> for TtsJobResponse {
    fn from(job: TtsJob) -> Self {
        let audio_url = job.available_audio().map(|_| audio_url(job.id));
        Self {
            id: job.id,
            text: job.text,
            voice: job.voice,
            rate: job.rate,
            pitch: job.pitch,
            ssml_preset: job.ssml_preset,
            status: job.status,
            audio_url,
            error_message: job.error_message,
            total_chunks: job.total_chunks,
            processed_chunks: job.processed_chunks,
            created_at: job.created_at,
            updated_at: job.updated_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            duration_seconds: job.duration_seconds,
            file_size_bytes: job.file_size_bytes,
            audio_expired_at: job.audio_expired_at,
        }
    }
}

impl From<&TtsJob> for TaskStatusResponse {
    fn from(job: &TtsJob) -> Self {
        Self {
            task_id: job.id,
            status: job.status,
            progress: job.progress(),
            message: job.error_message.clone(),
            result_url: job.available_audio().map(|_| audio_url(job.id)),
        }
    }
}
