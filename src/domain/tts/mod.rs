pub mod assembler;
pub mod chunker;
pub mod dto;
pub mod error;
pub mod housekeeping;
pub mod model;
pub mod runner;
pub mod service;
pub mod ssml;
pub mod text;
pub mod voice;
pub mod worker;

pub use assembler::{assemble, mp3_duration_seconds};
pub use chunker::{Chunk, Chunker, Chunks};
pub use dto::{CreateTtsJobRequest, ListTtsJobsQuery, TaskStatusResponse, TtsJobResponse};
pub use error::{AssemblyError, InvalidInput, SynthesisError, TtsServiceError};
pub use housekeeping::{Housekeeper, HousekeepingReport, HousekeepingSettings, HousekeepingTask};
pub use model::{JobFilter, JobStatus, StatusUpdate, TtsJob};
pub use runner::{JobRunner, RetryPolicy, RunOutcome};
pub use service::{SubmissionSettings, TtsJobService, TtsJobServiceApi};
pub use ssml::{chunker_for, SsmlPreset};
pub use text::clean_text;
pub use voice::{SpeechPitch, SpeechRate, VoiceConfig};
pub use worker::WorkerPool;
