use crate::domain::saved_audio::SavedAudio;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use std::sync::Arc;
use uuid::Uuid;

pub struct SavedAudioRepository {
    pool: Arc<DbPool>,
}

impl SavedAudioRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Get all saved audios, newest first
    pub async fn find_all(&self) -> AppResult<Vec<SavedAudio>> {
        let pool = self.pool.as_ref();
        let saved = sqlx::query_as::<_, SavedAudio>(
            r#"
            SELECT id, name, job_id, audio_path, text, voice,
                   duration_seconds, file_size_bytes, created_at
            FROM saved_audios
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(saved)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SavedAudio>> {
        let pool = self.pool.as_ref();
        let saved = sqlx::query_as::<_, SavedAudio>(
            r#"
            SELECT id, name, job_id, audio_path, text, voice,
                   duration_seconds, file_size_bytes, created_at
            FROM saved_audios
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(saved)
    }

    pub async fn create(&self, saved: &SavedAudio) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO saved_audios (
                id, name, job_id, audio_path, text, voice,
                duration_seconds, file_size_bytes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(saved.id)
        .bind(&saved.name)
        .bind(saved.job_id)
        .bind(&saved.audio_path)
        .bind(&saved.text)
        .bind(&saved.voice)
        .bind(saved.duration_seconds)
        .bind(saved.file_size_bytes)
        .bind(saved.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Delete a saved audio, returning the removed row
    pub async fn delete(&self, id: Uuid) -> AppResult<Option<SavedAudio>> {
        let pool = self.pool.as_ref();
        let saved = sqlx::query_as::<_, SavedAudio>(
            r#"
            DELETE FROM saved_audios
            WHERE id = $1
            RETURNING id, name, job_id, audio_path, text, voice,
                      duration_seconds, file_size_bytes, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(saved)
    }
}
