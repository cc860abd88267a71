use super::tts_repository::TtsRepository;
use crate::domain::tts::{SynthesisError, VoiceConfig};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI has a limit of 4096 characters per request
const MAX_CHUNK_CHARS: usize = 4096;

const DEFAULT_VOICE: &str = "alloy";

const VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Speed range accepted by the speech endpoint
const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

/// OpenAI TTS implementation of TTS repository
pub struct OpenAiTtsRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    default_voice: String,
}

impl OpenAiTtsRepository {
    pub fn new(
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        default_voice: Option<String>,
    ) -> Self {
        Self {
            client,
            model,
            default_voice: default_voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        }
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }

    fn voice_for(name: &str) -> Option<Voice> {
        match name.to_lowercase().as_str() {
            "alloy" => Some(Voice::Alloy),
            "echo" => Some(Voice::Echo),
            "fable" => Some(Voice::Fable),
            "onyx" => Some(Voice::Onyx),
            "nova" => Some(Voice::Nova),
            "shimmer" => Some(Voice::Shimmer),
            _ => None,
        }
    }

    fn speed_for(voice: &VoiceConfig) -> f32 {
        // Presets only shift the speed; the API has no pause or pitch controls
        (1.0 + voice.rate_percent() as f32 / 100.0).clamp(MIN_SPEED, MAX_SPEED)
    }
}

#[async_trait]
impl TtsRepository for OpenAiTtsRepository {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn max_chunk_chars(&self) -> usize {
        MAX_CHUNK_CHARS
    }

    fn default_voice(&self) -> &str {
        &self.default_voice
    }

    fn supports_voice(&self, voice: &str) -> bool {
        VOICES.contains(&voice.to_lowercase().as_str())
    }

    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SynthesisError> {
        let start_time = std::time::Instant::now();

        let voice_enum = Self::voice_for(&voice.voice).ok_or_else(|| {
            SynthesisError::InvalidVoice(format!("OpenAI has no voice named '{}'", voice.voice))
        })?;
        let speed = Self::speed_for(voice);

        tracing::info!(
            model = %self.model,
            voice = %voice.voice,
            speed = speed,
            text_length = text.len(),
            text_preview = %text.chars().take(200).collect::<String>(),
            "Calling OpenAI TTS API"
        );

        let request = CreateSpeechRequest {
            model: self.speech_model(),
            input: text.to_string(),
            voice: voice_enum,
            response_format: None, // Defaults to MP3
            speed: Some(speed),
        };

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    model = %self.model,
                    voice = %voice.voice,
                    text_length = text.len(),
                    "OpenAI TTS API call failed"
                );
                classify_openai_error(e)
            })?;

        let audio_bytes = response.bytes.to_vec();

        tracing::info!(
            provider = "openai",
            model = %self.model,
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.len(),
            audio_size_bytes = audio_bytes.len(),
            "TTS chunk synthesized"
        );

        Ok(audio_bytes)
    }
}

fn classify_openai_error(err: OpenAIError) -> SynthesisError {
    match err {
        OpenAIError::Reqwest(e) if e.is_timeout() => SynthesisError::Timeout(e.to_string()),
        OpenAIError::Reqwest(e) => SynthesisError::ProviderUnreachable(e.to_string()),
        OpenAIError::ApiError(api) => {
            let message = api.message.to_lowercase();
            if message.contains("rate limit") {
                SynthesisError::RateLimited(api.message)
            } else if message.contains("voice") {
                SynthesisError::InvalidVoice(api.message)
            } else {
                SynthesisError::Rejected(api.message)
            }
        }
        other => SynthesisError::Rejected(other.to_string()),
    }
}
