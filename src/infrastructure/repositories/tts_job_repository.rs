use crate::domain::tts::{JobFilter, JobStatus, StatusUpdate, TtsJob};
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Persistence for TTS job records.
///
/// Every status write is conditional on the prior status: `transition`
/// returns `false` when the job is missing or no longer in one of the
/// `expected` statuses, and nothing is written in that case.
#[async_trait]
pub trait TtsJobRepository: Send + Sync {
    async fn create(&self, job: &TtsJob) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TtsJob>>;

    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<TtsJob>>;

    /// Ids of jobs still waiting to be picked up, oldest first
    async fn pending_ids(&self) -> AppResult<Vec<Uuid>>;

    async fn transition(
        &self,
        id: Uuid,
        expected: &[JobStatus],
        update: StatusUpdate,
    ) -> AppResult<bool>;

    /// Record chunk progress of a processing job
    async fn update_progress(&self, id: Uuid, processed_chunks: i32) -> AppResult<()>;

    /// Delete a job if its status is one of `expected`
    async fn delete(&self, id: Uuid, expected: &[JobStatus]) -> AppResult<bool>;

    /// Processing jobs whose last progress was written before `updated_before`
    async fn stale_processing_ids(&self, updated_before: DateTime<Utc>) -> AppResult<Vec<Uuid>>;

    /// Completed jobs finished before `completed_before` whose audio is
    /// still kept, oldest first
    async fn expired_audio(
        &self,
        completed_before: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<TtsJob>>;

    /// Flag a completed job's audio as removed. `false` when the job is gone
    /// or was already flagged.
    async fn mark_audio_expired(&self, id: Uuid) -> AppResult<bool>;
}

const JOB_COLUMNS: &str = r#"
    id, text, voice, rate, pitch, ssml_preset, status, output_path, error_message,
    total_chunks, processed_chunks, file_size_bytes, duration_seconds,
    created_at, updated_at, started_at, completed_at, audio_expired_at
"#;

fn status_names(statuses: &[JobStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

pub struct PgTtsJobRepository {
    pool: Arc<DbPool>,
}

impl PgTtsJobRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TtsJobRepository for PgTtsJobRepository {
    async fn create(&self, job: &TtsJob) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            INSERT INTO tts_jobs (
                id, text, voice, rate, pitch, ssml_preset, status,
                total_chunks, processed_chunks, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(job.id)
        .bind(&job.text)
        .bind(&job.voice)
        .bind(&job.rate)
        .bind(&job.pitch)
        .bind(job.ssml_preset)
        .bind(job.status)
        .bind(job.total_chunks)
        .bind(job.processed_chunks)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TtsJob>> {
        let pool = self.pool.as_ref();
        let job = sqlx::query_as::<_, TtsJob>(&format!(
            "SELECT {} FROM tts_jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(job)
    }

    async fn list(&self, filter: &JobFilter) -> AppResult<Vec<TtsJob>> {
        let pool = self.pool.as_ref();
        let jobs = sqlx::query_as::<_, TtsJob>(&format!(
            r#"
            SELECT {}
            FROM tts_jobs
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            OFFSET $2
            LIMIT $3
            "#,
            JOB_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }

    async fn pending_ids(&self) -> AppResult<Vec<Uuid>> {
        let pool = self.pool.as_ref();
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM tts_jobs
            WHERE status = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: &[JobStatus],
        update: StatusUpdate,
    ) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let expected = status_names(expected);
        let target = update.target();

        let result = match update {
            StatusUpdate::Processing => {
                sqlx::query(
                    r#"
                    UPDATE tts_jobs
                    SET status = $2, started_at = NOW(), updated_at = NOW()
                    WHERE id = $1 AND status = ANY($3)
                    "#,
                )
                .bind(id)
                .bind(target)
                .bind(&expected)
                .execute(pool)
                .await?
            }
            StatusUpdate::Completed {
                output_path,
                file_size_bytes,
                duration_seconds,
            } => {
                sqlx::query(
                    r#"
                    UPDATE tts_jobs
                    SET status = $2,
                        output_path = $4,
                        file_size_bytes = $5,
                        duration_seconds = $6,
                        processed_chunks = total_chunks,
                        completed_at = NOW(),
                        updated_at = NOW()
                    WHERE id = $1 AND status = ANY($3)
                    "#,
                )
                .bind(id)
                .bind(target)
                .bind(&expected)
                .bind(output_path)
                .bind(file_size_bytes)
                .bind(duration_seconds)
                .execute(pool)
                .await?
            }
            StatusUpdate::Failed { error_message } => {
                sqlx::query(
                    r#"
                    UPDATE tts_jobs
                    SET status = $2, error_message = $4, completed_at = NOW(), updated_at = NOW()
                    WHERE id = $1 AND status = ANY($3)
                    "#,
                )
                .bind(id)
                .bind(target)
                .bind(&expected)
                .bind(error_message)
                .execute(pool)
                .await?
            }
            StatusUpdate::Cancelled => {
                sqlx::query(
                    r#"
                    UPDATE tts_jobs
                    SET status = $2, completed_at = NOW(), updated_at = NOW()
                    WHERE id = $1 AND status = ANY($3)
                    "#,
                )
                .bind(id)
                .bind(target)
                .bind(&expected)
                .execute(pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    async fn update_progress(&self, id: Uuid, processed_chunks: i32) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query(
            r#"
            UPDATE tts_jobs
            SET processed_chunks = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(processed_chunks)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid, expected: &[JobStatus]) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let result = sqlx::query(
            r#"
            DELETE FROM tts_jobs
            WHERE id = $1 AND status = ANY($2)
            "#,
        )
        .bind(id)
        .bind(status_names(expected))
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stale_processing_ids(&self, updated_before: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let pool = self.pool.as_ref();
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM tts_jobs
            WHERE status = 'processing' AND updated_at < $1
            ORDER BY updated_at ASC
            "#,
        )
        .bind(updated_before)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    async fn expired_audio(
        &self,
        completed_before: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<TtsJob>> {
        let pool = self.pool.as_ref();
        let jobs = sqlx::query_as::<_, TtsJob>(&format!(
            r#"
            SELECT {}
            FROM tts_jobs
            WHERE status = 'completed'
              AND audio_expired_at IS NULL
              AND completed_at < $1
            ORDER BY completed_at ASC
            LIMIT $2
            "#,
            JOB_COLUMNS
        ))
        .bind(completed_before)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }

    async fn mark_audio_expired(&self, id: Uuid) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE tts_jobs
            SET audio_expired_at = NOW(), file_size_bytes = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'completed' AND audio_expired_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
