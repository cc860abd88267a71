pub mod openai_tts_repository;
pub mod polly_tts_repository;
pub mod saved_audio_repository;
pub mod tts_job_repository;
pub mod tts_repository;

pub use openai_tts_repository::OpenAiTtsRepository;
pub use polly_tts_repository::PollyTtsRepository;
pub use saved_audio_repository::SavedAudioRepository;
pub use tts_job_repository::{PgTtsJobRepository, TtsJobRepository};
pub use tts_repository::TtsRepository;
