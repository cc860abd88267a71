use super::error::SavedAudioServiceError;
use super::{CreateSavedAudioRequest, SavedAudio, SavedAudioResponse};
use crate::infrastructure::repositories::{SavedAudioRepository, TtsJobRepository};
use crate::infrastructure::storage::{AudioStorage, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 500;

pub struct SavedAudioService {
    saved_repo: Arc<SavedAudioRepository>,
    jobs: Arc<dyn TtsJobRepository>,
    storage: AudioStorage,
}

impl SavedAudioService {
    pub fn new(
        saved_repo: Arc<SavedAudioRepository>,
        jobs: Arc<dyn TtsJobRepository>,
        storage: AudioStorage,
    ) -> Self {
        Self {
            saved_repo,
            jobs,
            storage,
        }
    }

    fn validate_name(&self, name: &str) -> Result<String, SavedAudioServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SavedAudioServiceError::Invalid(
                "Name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(SavedAudioServiceError::Invalid(format!(
                "Name must be {} characters or less",
                MAX_NAME_LEN
            )));
        }
        Ok(name.to_string())
    }
}

#[async_trait]
pub trait SavedAudioServiceApi: Send + Sync {
    /// Keep a named copy of a completed job's audio
    async fn save(
        &self,
        request: CreateSavedAudioRequest,
    ) -> Result<SavedAudioResponse, SavedAudioServiceError>;

    async fn list(&self) -> Result<Vec<SavedAudioResponse>, SavedAudioServiceError>;

    async fn delete(&self, id: Uuid) -> Result<(), SavedAudioServiceError>;

    async fn get_audio(&self, id: Uuid) -> Result<Vec<u8>, SavedAudioServiceError>;
}

#[async_trait]
impl SavedAudioServiceApi for SavedAudioService {
    async fn save(
        &self,
        request: CreateSavedAudioRequest,
    ) -> Result<SavedAudioResponse, SavedAudioServiceError> {
        let name = self.validate_name(&request.name)?;

        let job = self
            .jobs
            .find_by_id(request.task_id)
            .await
            .map_err(|e| SavedAudioServiceError::Dependency(e.to_string()))?
            .ok_or(SavedAudioServiceError::JobNotFound)?;

        if job.audio_expired_at.is_some() {
            return Err(SavedAudioServiceError::Invalid(
                "Task audio has expired".to_string(),
            ));
        }
        let output_path = match job.available_audio() {
            Some(path) => path.to_string(),
            None => {
                return Err(SavedAudioServiceError::Invalid(format!(
                    "Only completed tasks can be saved (task is {})",
                    job.status
                )))
            }
        };

        let audio_path = self
            .storage
            .copy_to_saved(&output_path, job.id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => {
                    SavedAudioServiceError::Invalid("Task audio file is missing".to_string())
                }
                other => SavedAudioServiceError::Dependency(other.to_string()),
            })?;

        let saved = SavedAudio {
            id: Uuid::new_v4(),
            name,
            job_id: job.id,
            audio_path,
            text: job.text,
            voice: job.voice,
            duration_seconds: job.duration_seconds,
            file_size_bytes: job.file_size_bytes,
            created_at: Utc::now(),
        };

        if let Err(e) = self.saved_repo.create(&saved).await {
            if let Err(cleanup) = self.storage.delete(&saved.audio_path).await {
                tracing::warn!(error = %cleanup, "Failed to remove orphaned saved audio file");
            }
            return Err(SavedAudioServiceError::Dependency(e.to_string()));
        }

        tracing::info!(
            saved_audio_id = %saved.id,
            job_id = %saved.job_id,
            name = %saved.name,
            "Audio saved"
        );

        Ok(SavedAudioResponse::from(saved))
    }

    async fn list(&self) -> Result<Vec<SavedAudioResponse>, SavedAudioServiceError> {
        let saved = self
            .saved_repo
            .find_all()
            .await
            .map_err(|e| SavedAudioServiceError::Dependency(e.to_string()))?;
        Ok(saved.into_iter().map(SavedAudioResponse::from).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), SavedAudioServiceError> {
        let saved = self
            .saved_repo
            .delete(id)
            .await
            .map_err(|e| SavedAudioServiceError::Dependency(e.to_string()))?
            .ok_or(SavedAudioServiceError::NotFound)?;

        if let Err(e) = self.storage.delete(&saved.audio_path).await {
            tracing::warn!(saved_audio_id = %id, error = %e, "Failed to delete saved audio file");
        }

        tracing::info!(saved_audio_id = %id, "Saved audio deleted");
        Ok(())
    }

    async fn get_audio(&self, id: Uuid) -> Result<Vec<u8>, SavedAudioServiceError> {
        let saved = self
            .saved_repo
            .find_by_id(id)
            .await
            .map_err(|e| SavedAudioServiceError::Dependency(e.to_string()))?
            .ok_or(SavedAudioServiceError::NotFound)?;

        self.storage
            .read(&saved.audio_path)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => SavedAudioServiceError::NotFound,
                other => SavedAudioServiceError::Dependency(other.to_string()),
            })
    }
}
