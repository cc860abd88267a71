use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedAudio {
    pub id: Uuid,
    pub name: String,
    pub job_id: Uuid,
    pub audio_path: String,
    pub text: String,
    pub voice: String,
    pub duration_seconds: Option<i32>,
    pub file_size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}
