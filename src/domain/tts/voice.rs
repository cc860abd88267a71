use super::error::InvalidInput;
use super::ssml::SsmlPreset;
use serde::{Deserialize, Serialize};

pub const MIN_RATE_PERCENT: i16 = -50;
pub const MAX_RATE_PERCENT: i16 = 100;
pub const MIN_PITCH_HZ: i16 = -50;
pub const MAX_PITCH_HZ: i16 = 50;
const MAX_VOICE_LEN: usize = 50;

/// Relative speaking rate, e.g. `-15%` is 15% slower than normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechRate(i16);

impl SpeechRate {
    pub fn percent(&self) -> i16 {
        self.0
    }
}

impl std::str::FromStr for SpeechRate {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_signed(s, "%").ok_or_else(|| {
            InvalidInput(format!(
                "rate '{}' must look like '+10%' or '-15%'",
                s
            ))
        })?;
        if !(MIN_RATE_PERCENT..=MAX_RATE_PERCENT).contains(&value) {
            return Err(InvalidInput(format!(
                "rate must be between {}% and +{}%",
                MIN_RATE_PERCENT, MAX_RATE_PERCENT
            )));
        }
        Ok(Self(value))
    }
}

impl std::fmt::Display for SpeechRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+}%", self.0)
    }
}

/// Pitch offset in hertz, e.g. `-2Hz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechPitch(i16);

impl SpeechPitch {
    pub fn hertz(&self) -> i16 {
        self.0
    }
}

impl std::str::FromStr for SpeechPitch {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_signed(s, "Hz").ok_or_else(|| {
            InvalidInput(format!("pitch '{}' must look like '+5Hz' or '-2Hz'", s))
        })?;
        if !(MIN_PITCH_HZ..=MAX_PITCH_HZ).contains(&value) {
            return Err(InvalidInput(format!(
                "pitch must be between {}Hz and +{}Hz",
                MIN_PITCH_HZ, MAX_PITCH_HZ
            )));
        }
        Ok(Self(value))
    }
}

impl std::fmt::Display for SpeechPitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+}Hz", self.0)
    }
}

fn parse_signed(s: &str, unit: &str) -> Option<i16> {
    let digits = s.trim().strip_suffix(unit)?;
    let unsigned = digits.trim_start_matches(['+', '-']);
    if unsigned.is_empty() || !unsigned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Validated voice parameters for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub voice: String,
    pub rate: SpeechRate,
    pub pitch: SpeechPitch,
    #[serde(default)]
    pub preset: Option<SsmlPreset>,
}

impl VoiceConfig {
    pub fn parse(voice: &str, rate: &str, pitch: &str) -> Result<Self, InvalidInput> {
        let voice = voice.trim();
        if voice.is_empty() {
            return Err(InvalidInput("voice cannot be empty".to_string()));
        }
        if voice.chars().count() > MAX_VOICE_LEN {
            return Err(InvalidInput(format!(
                "voice must be {} characters or less",
                MAX_VOICE_LEN
            )));
        }
        if !voice
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InvalidInput(format!(
                "voice '{}' contains unsupported characters",
                voice
            )));
        }

        Ok(Self {
            voice: voice.to_string(),
            rate: rate.parse()?,
            pitch: pitch.parse()?,
            preset: None,
        })
    }

    pub fn with_preset(mut self, preset: Option<SsmlPreset>) -> Self {
        self.preset = preset;
        self
    }

    /// Rate with the preset's shift applied, in percent relative to normal
    pub fn rate_percent(&self) -> i16 {
        self.rate.percent() + self.preset.map_or(0, |p| p.profile().rate_percent)
    }
}
