use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    pub storage_path: PathBuf,
    // TTS provider
    pub tts_provider: TtsProvider,
    pub aws_region: String,
    pub openai_api_key: Option<String>,
    pub openai_tts_model: String,
    pub tts_default_voice: Option<String>,
    pub tts_default_rate: String,
    pub tts_default_pitch: String,
    // Text limits
    pub max_text_chars: usize,
    pub max_chars_per_chunk: usize,
    // Synthesis retries
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub synthesis_timeout_secs: u64,
    // TTS Cache
    pub tts_cache_enabled: bool,
    // Workers and queue
    pub worker_concurrency: usize,
    pub queue_backend: QueueBackend,
    pub queue_poll_interval_ms: u64,
    // Housekeeping
    pub audio_retention_hours: u64,
    pub stale_job_secs: u64,
    pub housekeeping_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    Polly,
    OpenAi,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    Postgres,
    Memory,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str, default: &str| -> String {
            lookup(name).unwrap_or_else(|| default.to_string())
        };

        let tts_provider = match var("TTS_PROVIDER", "polly").to_lowercase().as_str() {
            "polly" => TtsProvider::Polly,
            "openai" => TtsProvider::OpenAi,
            other => {
                return Err(ConfigError::Invalid {
                    name: "TTS_PROVIDER",
                    value: other.to_string(),
                    reason: "expected 'polly' or 'openai'".to_string(),
                })
            }
        };

        let openai_api_key = lookup("OPENAI_API_KEY").filter(|key| !key.is_empty());
        if tts_provider == TtsProvider::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }

        let queue_backend = match var("QUEUE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" => QueueBackend::Postgres,
            "memory" => QueueBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "QUEUE_BACKEND",
                    value: other.to_string(),
                    reason: "expected 'postgres' or 'memory'".to_string(),
                })
            }
        };

        let max_chars_per_chunk: usize = parse(&lookup, "TTS_MAX_CHARS_PER_CHUNK", "500")?;
        if max_chars_per_chunk == 0 {
            return Err(ConfigError::Invalid {
                name: "TTS_MAX_CHARS_PER_CHUNK",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let max_retries: u32 = parse(&lookup, "TTS_MAX_RETRIES", "3")?;
        if max_retries == 0 {
            return Err(ConfigError::Invalid {
                name: "TTS_MAX_RETRIES",
                value: "0".to_string(),
                reason: "must allow at least one attempt".to_string(),
            });
        }

        let housekeeping_interval_secs: u64 = parse(&lookup, "HOUSEKEEPING_INTERVAL_SECS", "300")?;
        if housekeeping_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "HOUSEKEEPING_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let config = Config {
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            host: var("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", "8080")?,
            environment: match var("ENVIRONMENT", "development").as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match var("LOG_FORMAT", "pretty").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            storage_path: PathBuf::from(var("STORAGE_PATH", "./storage")),
            tts_provider,
            aws_region: var("AWS_REGION", "eu-west-1"),
            openai_api_key,
            openai_tts_model: var("OPENAI_TTS_MODEL", "tts-1"),
            tts_default_voice: lookup("TTS_DEFAULT_VOICE").filter(|voice| !voice.is_empty()),
            tts_default_rate: var("TTS_DEFAULT_RATE", "+0%"),
            tts_default_pitch: var("TTS_DEFAULT_PITCH", "+0Hz"),
            max_text_chars: parse(&lookup, "TTS_MAX_TEXT_CHARS", "10000")?,
            max_chars_per_chunk,
            max_retries,
            retry_backoff_ms: parse(&lookup, "TTS_RETRY_BACKOFF_MS", "1000")?,
            synthesis_timeout_secs: parse(&lookup, "TTS_SYNTHESIS_TIMEOUT_SECS", "30")?,
            tts_cache_enabled: var("TTS_CACHE_ENABLED", "false").to_lowercase() == "true",
            worker_concurrency: parse(&lookup, "WORKER_CONCURRENCY", "3")?,
            queue_backend,
            queue_poll_interval_ms: parse(&lookup, "QUEUE_POLL_INTERVAL_MS", "500")?,
            audio_retention_hours: parse(&lookup, "AUDIO_RETENTION_HOURS", "24")?,
            stale_job_secs: parse(&lookup, "STALE_JOB_SECS", "600")?,
            housekeeping_interval_secs,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_millis(self.queue_poll_interval_ms)
    }

    /// `None` when `AUDIO_RETENTION_HOURS` is 0, keeping audio forever
    pub fn audio_retention(&self) -> Option<Duration> {
        (self.audio_retention_hours > 0)
            .then(|| Duration::from_secs(self.audio_retention_hours * 3600))
    }

    pub fn stale_job_after(&self) -> Duration {
        Duration::from_secs(self.stale_job_secs)
    }

    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_secs(self.housekeeping_interval_secs)
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = lookup(name).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: value.clone(),
        reason: e.to_string(),
    })
}
