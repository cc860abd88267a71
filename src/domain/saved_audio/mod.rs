pub mod error;
pub mod model;
pub mod service;

use chrono::{DateTime, Utc};
pub use error::SavedAudioServiceError;
pub use model::SavedAudio;
use serde::{Deserialize, Serialize};
pub use service::{SavedAudioService, SavedAudioServiceApi};
use uuid::Uuid;

/// Request for POST /api/saved-audios
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSavedAudioRequest {
    pub task_id: Uuid,
    pub name: String,
}

/// Response for saved audio endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedAudioResponse {
    pub id: Uuid,
    pub name: String,
    pub task_id: Uuid,
    pub text: String,
    pub voice: String,
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Response for GET /api/saved-audios
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedAudioListResponse {
    pub saved_audios: Vec<SavedAudioResponse>,
}

impl From<SavedAudio> for SavedAudioResponse {
    fn from(saved: SavedAudio) -> Self {
        Self {
            audio_url: format!("/api/saved-audios/{}/audio", saved.id),
            id: saved.id,
            name: saved.name,
            task_id: saved.job_id,
            text: saved.text,
            voice: saved.voice,
            duration_seconds: saved.duration_seconds,
            file_size_bytes: saved.file_size_bytes,
            created_at: saved.created_at,
        }
    }
}
