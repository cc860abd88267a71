use aivoice_backend::domain::tts::{SynthesisError, VoiceConfig};
use aivoice_backend::infrastructure::repositories::TtsRepository;
use async_trait::async_trait;
use std::time::Duration;

/// Default voice, synthesizes immediately
pub const STUB_VOICE: &str = "stub";
/// Sleeps before every chunk so jobs stay in `processing` for a while
pub const SLOW_VOICE: &str = "stub-slow";
/// Provider rejects every request
pub const BROKEN_VOICE: &str = "stub-broken";

const SLOW_CHUNK_DELAY: Duration = Duration::from_millis(400);

/// Offline synthesizer for end-to-end tests.
///
/// Each chunk becomes `ID3` followed by the chunk text, so assembled output
/// can be checked for order without decoding anything.
pub struct StubTtsRepository {
    max_chunk_chars: usize,
}

impl StubTtsRepository {
    pub fn new(max_chunk_chars: usize) -> Self {
        Self { max_chunk_chars }
    }
}

#[async_trait]
impl TtsRepository for StubTtsRepository {
    fn provider_name(&self) -> &'static str {
        "stub"
    }

    fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    fn default_voice(&self) -> &str {
        STUB_VOICE
    }

    fn supports_voice(&self, voice: &str) -> bool {
        matches!(voice, STUB_VOICE | SLOW_VOICE | BROKEN_VOICE)
    }

    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SynthesisError> {
        match voice.voice.as_str() {
            BROKEN_VOICE => Err(SynthesisError::Rejected(
                "stub provider refuses this voice".to_string(),
            )),
            SLOW_VOICE => {
                tokio::time::sleep(SLOW_CHUNK_DELAY).await;
                Ok(format!("ID3{}", text).into_bytes())
            }
            _ => Ok(format!("ID3{}", text).into_bytes()),
        }
    }
}
