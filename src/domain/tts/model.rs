use super::ssml::SsmlPreset;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a TTS job.
///
/// `Pending -> Processing -> {Completed, Failed, Cancelled}`, plus
/// `Pending -> Cancelled`. Terminal states are never left.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Cancelled)
        )
    }

    /// Statuses from which `next` may legally be entered.
    pub fn predecessors_of(next: JobStatus) -> Vec<JobStatus> {
        JobStatus::ALL
            .iter()
            .copied()
            .filter(|status| status.can_transition_to(next))
            .collect()
    }

    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status '{}'", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TtsJob {
    pub id: Uuid,
    pub text: String,
    pub voice: String,
    pub rate: String,
    pub pitch: String,
    pub ssml_preset: Option<SsmlPreset>,
    pub status: JobStatus,
    pub output_path: Option<String>,
    pub error_message: Option<String>,
    pub total_chunks: i32,
    pub processed_chunks: i32,
    pub file_size_bytes: Option<i64>,
    pub duration_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set once retention has removed the audio of a completed job
    pub audio_expired_at: Option<DateTime<Utc>>,
}

impl TtsJob {
    /// Build a fresh pending job. Text and voice parameters never change afterwards.
    pub fn new_pending(
        text: String,
        voice: String,
        rate: String,
        pitch: String,
        total_chunks: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            text,
            voice,
            rate,
            pitch,
            ssml_preset: None,
            status: JobStatus::Pending,
            output_path: None,
            error_message: None,
            total_chunks,
            processed_chunks: 0,
            file_size_bytes: None,
            duration_seconds: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            audio_expired_at: None,
        }
    }

    pub fn with_ssml_preset(mut self, preset: Option<SsmlPreset>) -> Self {
        self.ssml_preset = preset;
        self
    }

    /// Key of the job's audio while it is still downloadable
    pub fn available_audio(&self) -> Option<&str> {
        match (self.status, self.audio_expired_at) {
            (JobStatus::Completed, None) => self.output_path.as_deref(),
            _ => None,
        }
    }

    /// Fraction of chunks synthesized, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.status == JobStatus::Completed {
            return 1.0;
        }
        if self.total_chunks <= 0 {
            return 0.0;
        }
        (self.processed_chunks as f32 / self.total_chunks as f32).clamp(0.0, 1.0)
    }

    /// Apply a status update in memory, mirroring what the repository persists.
    pub fn apply(&mut self, update: &StatusUpdate) {
        let now = Utc::now();
        self.status = update.target();
        self.updated_at = now;
        match update {
            StatusUpdate::Processing => {
                self.started_at = Some(now);
            }
            StatusUpdate::Completed {
                output_path,
                file_size_bytes,
                duration_seconds,
            } => {
                self.output_path = Some(output_path.clone());
                self.file_size_bytes = Some(*file_size_bytes);
                self.duration_seconds = Some(*duration_seconds);
                self.processed_chunks = self.total_chunks;
                self.completed_at = Some(now);
            }
            StatusUpdate::Failed { error_message } => {
                self.error_message = Some(error_message.clone());
                self.completed_at = Some(now);
            }
            StatusUpdate::Cancelled => {
                self.completed_at = Some(now);
            }
        }
    }
}

/// A single state transition together with the fields it sets.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Processing,
    Completed {
        output_path: String,
        file_size_bytes: i64,
        duration_seconds: i32,
    },
    Failed {
        error_message: String,
    },
    Cancelled,
}

impl StatusUpdate {
    pub fn target(&self) -> JobStatus {
        match self {
            StatusUpdate::Processing => JobStatus::Processing,
            StatusUpdate::Completed { .. } => JobStatus::Completed,
            StatusUpdate::Failed { .. } => JobStatus::Failed,
            StatusUpdate::Cancelled => JobStatus::Cancelled,
        }
    }
}

/// Filter for listing jobs, newest first.
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            status: None,
            skip: 0,
            limit: 50,
        }
    }
}
