use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum SavedAudioServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("saved audio not found")]
    NotFound,
    #[error("TTS job not found")]
    JobNotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<AppError> for SavedAudioServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => SavedAudioServiceError::Invalid(msg),
            AppError::NotFound(_) => SavedAudioServiceError::NotFound,
            _ => SavedAudioServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<SavedAudioServiceError> for AppError {
    fn from(err: SavedAudioServiceError) -> Self {
        match err {
            SavedAudioServiceError::Invalid(msg) => AppError::BadRequest(msg),
            SavedAudioServiceError::NotFound => {
                AppError::NotFound("Saved audio not found".to_string())
            }
            SavedAudioServiceError::JobNotFound => {
                AppError::NotFound("TTS job not found".to_string())
            }
            SavedAudioServiceError::Dependency(msg) => AppError::Internal(msg),
            SavedAudioServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
