use super::tts_repository::TtsRepository;
use crate::domain::tts::{ssml::PresetProfile, SynthesisError, VoiceConfig};
use async_trait::async_trait;
use aws_sdk_polly::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{Engine, OutputFormat, TextType, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;

/// AWS Polly has a limit of 3000 billed characters per request
const MAX_CHUNK_CHARS: usize = 3000;

const DEFAULT_VOICE: &str = "Joanna";

/// Prosody rate range Polly accepts, in percent of normal speed
const MIN_RATE: i16 = 20;
const MAX_RATE: i16 = 200;

/// Voices that support the neural engine
/// Based on AWS Polly documentation
const NEURAL_VOICES: &[&str] = &[
    // English
    "Joanna", "Matthew", "Ivy", "Kendra", "Kimberly", "Salli", "Joey", "Justin", "Kevin",
    "Amy", "Emma", "Brian", "Olivia", "Aria", "Ayanda",
    // Spanish
    "Lupe", "Pedro", "Sergio", "Lucia", "Mia",
    // French
    "Lea", "Remi",
    // German
    "Vicki", "Daniel",
    // Italian
    "Bianca", "Adriano",
    // Portuguese
    "Ines", "Camila", "Vitoria", "Thiago",
    // Japanese
    "Takumi", "Kazuha", "Tomoko",
    // Korean
    "Seoyeon",
    // Mandarin Chinese
    "Zhiyu",
    // Arabic
    "Hala", "Zayd",
];

/// Voices only available on the standard engine
const STANDARD_VOICES: &[&str] = &[
    "Nicole", "Russell", "Raveena", "Geraint", "Conchita", "Enrique", "Celine", "Mathieu",
    "Hans", "Marlene", "Carla", "Giorgio", "Cristiano", "Mizuki", "Maxim", "Tatyana",
];

/// AWS Polly implementation of TTS repository
pub struct PollyTtsRepository {
    polly_client: Arc<PollyClient>,
    default_voice: String,
}

impl PollyTtsRepository {
    pub fn new(polly_client: Arc<PollyClient>, default_voice: Option<String>) -> Self {
        Self {
            polly_client,
            default_voice: default_voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        }
    }

    fn is_neural(voice: &str) -> bool {
        NEURAL_VOICES.contains(&voice)
    }

    /// Wrap text in SSML carrying the rate (and, on the standard engine,
    /// pitch). A preset adds its prosody shift and pauses.
    fn build_ssml(text: &str, voice: &VoiceConfig, neural: bool) -> String {
        // Polly expresses rate as a percentage of normal speed
        let rate = format!("{}%", (100 + voice.rate_percent()).clamp(MIN_RATE, MAX_RATE));
        let body = match voice.preset {
            Some(preset) => with_pauses(text, &preset.profile()),
            None => escape_xml(text),
        };

        // Polly takes relative pitch in percent; map Hz against a 200 Hz baseline
        let pitch_percent =
            voice.pitch.hertz() / 2 + voice.preset.map_or(0, |p| p.profile().pitch_percent);

        if neural || pitch_percent == 0 {
            format!(r#"<speak><prosody rate="{}">{}</prosody></speak>"#, rate, body)
        } else {
            format!(
                r#"<speak><prosody rate="{}" pitch="{:+}%">{}</prosody></speak>"#,
                rate, pitch_percent, body
            )
        }
    }
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    fn provider_name(&self) -> &'static str {
        "polly"
    }

    fn max_chunk_chars(&self) -> usize {
        MAX_CHUNK_CHARS
    }

    fn default_voice(&self) -> &str {
        &self.default_voice
    }

    fn supports_voice(&self, voice: &str) -> bool {
        NEURAL_VOICES.contains(&voice) || STANDARD_VOICES.contains(&voice)
    }

    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SynthesisError> {
        let start_time = std::time::Instant::now();
        let neural = Self::is_neural(&voice.voice);
        let engine = if neural { Engine::Neural } else { Engine::Standard };

        if neural && (voice.pitch.hertz() != 0 || voice.preset.is_some()) {
            tracing::debug!(
                voice = %voice.voice,
                pitch = %voice.pitch,
                "Neural engine ignores pitch"
            );
        }

        let ssml = Self::build_ssml(text, voice, neural);

        tracing::info!(
            voice = %voice.voice,
            engine = ?engine,
            rate = %voice.rate,
            ssml_preset = ?voice.preset,
            output_format = "Mp3",
            text_length = text.len(),
            text_preview = %text.chars().take(200).collect::<String>(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(ssml)
            .text_type(TextType::Ssml)
            .voice_id(VoiceId::from(voice.voice.as_str()))
            .output_format(OutputFormat::Mp3)
            .engine(engine.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    voice = %voice.voice,
                    engine = ?engine,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                classify_polly_error(&e)
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            SynthesisError::ProviderUnreachable(format!("Failed to read audio stream: {}", e))
        })?;

        let audio_bytes = audio_stream.into_bytes().to_vec();

        tracing::info!(
            provider = "polly",
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.len(),
            audio_size_bytes = audio_bytes.len(),
            "TTS chunk synthesized"
        );

        Ok(audio_bytes)
    }
}

/// Map an SDK failure onto transient vs structural synthesis errors
fn classify_polly_error<E, R>(err: &SdkError<E, R>) -> SynthesisError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(err).to_string();

    match err {
        SdkError::TimeoutError(_) => return SynthesisError::Timeout(detail),
        SdkError::DispatchFailure(_) => return SynthesisError::ProviderUnreachable(detail),
        _ => {}
    }

    match err.code() {
        Some("ThrottlingException") | Some("Throttling") | Some("TooManyRequestsException") => {
            SynthesisError::RateLimited(detail)
        }
        Some("ServiceFailureException") | Some("ServiceUnavailableException") => {
            SynthesisError::ProviderUnreachable(detail)
        }
        Some("LanguageNotSupportedException") | Some("EngineNotSupportedException") => {
            SynthesisError::InvalidVoice(detail)
        }
        Some("ValidationException")
            if err
                .message()
                .map_or(false, |m| m.to_lowercase().contains("voice")) =>
        {
            SynthesisError::InvalidVoice(detail)
        }
        Some(_) => SynthesisError::Rejected(detail),
        None => SynthesisError::ProviderUnreachable(detail),
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        push_escaped(&mut escaped, c);
    }
    escaped
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&apos;"),
        _ => out.push(c),
    }
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？')
}

/// Escape `text`, pausing after commas and between sentences
fn with_pauses(text: &str, profile: &PresetProfile) -> String {
    let comma_break = format!(r#"<break time="{}ms"/>"#, profile.comma_pause_ms);
    let sentence_break = format!(r#"<break time="{}ms"/>"#, profile.sentence_pause_ms);

    let mut ssml = String::with_capacity(text.len() * 2);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        push_escaped(&mut ssml, c);

        if matches!(c, ',' | '，' | '、') {
            ssml.push_str(&comma_break);
        } else if is_sentence_end(c) && !chars.peek().map_or(false, |next| is_sentence_end(*next)) {
            while chars.peek().map_or(false, |next| next.is_whitespace()) {
                chars.next();
            }
            // No pause after the last sentence of the chunk
            if chars.peek().is_some() {
                ssml.push_str(&sentence_break);
            }
        }
    }
    ssml
}
