use crate::error::AppError;

/// Rejection of user-provided input before a job is ever created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid input: {0}")]
pub struct InvalidInput(pub String);

/// Failure reported by a speech synthesis provider for one chunk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("provider unreachable: {0}")]
    ProviderUnreachable(String),
    #[error("provider timed out: {0}")]
    Timeout(String),
    #[error("provider rate limited: {0}")]
    RateLimited(String),
    #[error("invalid voice: {0}")]
    InvalidVoice(String),
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

impl SynthesisError {
    /// Transient errors are retried; structural ones fail the job immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SynthesisError::ProviderUnreachable(_)
                | SynthesisError::Timeout(_)
                | SynthesisError::RateLimited(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("no audio chunks to assemble")]
    Empty,
    #[error("audio chunk {index} is malformed: {reason}")]
    MalformedChunk { index: usize, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TtsServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("text too large: {0}")]
    PayloadTooLarge(String),
    #[error("TTS job not found")]
    NotFound,
    #[error("audio not available: {0}")]
    AudioNotReady(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<InvalidInput> for TtsServiceError {
    fn from(err: InvalidInput) -> Self {
        TtsServiceError::Invalid(err.0)
    }
}

impl From<AppError> for TtsServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => TtsServiceError::Invalid(msg),
            AppError::PayloadTooLarge(msg) => TtsServiceError::PayloadTooLarge(msg),
            AppError::NotFound(_) => TtsServiceError::NotFound,
            AppError::Conflict(msg) => TtsServiceError::Conflict(msg),
            _ => TtsServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<TtsServiceError> for AppError {
    fn from(err: TtsServiceError) -> Self {
        match err {
            TtsServiceError::Invalid(msg) => AppError::BadRequest(msg),
            TtsServiceError::PayloadTooLarge(msg) => AppError::PayloadTooLarge(msg),
            TtsServiceError::NotFound => AppError::NotFound("TTS job not found".to_string()),
            TtsServiceError::AudioNotReady(msg) => AppError::NotFound(msg),
            TtsServiceError::Conflict(msg) => AppError::Conflict(msg),
            TtsServiceError::Dependency(msg) => AppError::ExternalService(msg),
            TtsServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
