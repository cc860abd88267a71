use crate::domain::tts::{SynthesisError, VoiceConfig};
use async_trait::async_trait;

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider (AWS Polly, OpenAI, ...)
///
/// Implementations synthesize exactly one chunk per call. Splitting text and
/// merging audio is done by the job runner so that ordering, retries and
/// cancellation work the same for every provider.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Short provider name used in logs and readiness output
    fn provider_name(&self) -> &'static str;

    /// Largest chunk (in characters) the provider accepts per request
    fn max_chunk_chars(&self) -> usize;

    /// Voice used when a submission does not name one
    fn default_voice(&self) -> &str;

    /// Whether `voice` is known to the provider
    fn supports_voice(&self, voice: &str) -> bool;

    /// Synthesize one text chunk to MP3 audio
    ///
    /// # Errors
    /// Transient failures (unreachable, rate limited) are reported as such so
    /// the runner can retry them; structural ones fail the job.
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SynthesisError>;
}
