use super::chunker::Chunker;
use super::error::InvalidInput;
use serde::{Deserialize, Serialize};

/// Named delivery style for a job.
///
/// A preset shifts rate and pitch on top of the job's own values, adds
/// pauses after commas and between sentences, and shortens chunks so the
/// pauses land on natural boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SsmlPreset {
    BedtimeSoft,
    BedtimeBalanced,
    BedtimeFairy,
    HorrorSuspense,
    Romantic,
    Passionate,
    Melancholy,
    News,
    Educational,
}

/// Prosody and pauses of a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetProfile {
    /// Added to the job's rate, in percent of normal speed
    pub rate_percent: i16,
    /// Relative pitch in percent, honoured by engines that support it
    pub pitch_percent: i16,
    pub comma_pause_ms: u32,
    pub sentence_pause_ms: u32,
    pub max_sentence_chars: usize,
}

const fn profile(
    rate_percent: i16,
    pitch_percent: i16,
    comma_pause_ms: u32,
    sentence_pause_ms: u32,
    max_sentence_chars: usize,
) -> PresetProfile {
    PresetProfile {
        rate_percent,
        pitch_percent,
        comma_pause_ms,
        sentence_pause_ms,
        max_sentence_chars,
    }
}

impl SsmlPreset {
    pub const ALL: [SsmlPreset; 9] = [
        SsmlPreset::BedtimeSoft,
        SsmlPreset::BedtimeBalanced,
        SsmlPreset::BedtimeFairy,
        SsmlPreset::HorrorSuspense,
        SsmlPreset::Romantic,
        SsmlPreset::Passionate,
        SsmlPreset::Melancholy,
        SsmlPreset::News,
        SsmlPreset::Educational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SsmlPreset::BedtimeSoft => "BEDTIME_SOFT",
            SsmlPreset::BedtimeBalanced => "BEDTIME_BALANCED",
            SsmlPreset::BedtimeFairy => "BEDTIME_FAIRY",
            SsmlPreset::HorrorSuspense => "HORROR_SUSPENSE",
            SsmlPreset::Romantic => "ROMANTIC",
            SsmlPreset::Passionate => "PASSIONATE",
            SsmlPreset::Melancholy => "MELANCHOLY",
            SsmlPreset::News => "NEWS",
            SsmlPreset::Educational => "EDUCATIONAL",
        }
    }

    pub fn profile(&self) -> PresetProfile {
        match self {
            SsmlPreset::BedtimeSoft => profile(-25, -5, 500, 1000, 120),
            SsmlPreset::BedtimeBalanced => profile(-15, 1, 350, 700, 150),
            SsmlPreset::BedtimeFairy => profile(-10, 5, 300, 600, 160),
            SsmlPreset::HorrorSuspense => profile(-30, -30, 600, 1500, 120),
            SsmlPreset::Romantic => profile(-10, 5, 300, 600, 160),
            SsmlPreset::Passionate => profile(20, 15, 200, 400, 150),
            SsmlPreset::Melancholy => profile(-25, -20, 500, 1200, 130),
            SsmlPreset::News => profile(5, 2, 250, 500, 180),
            SsmlPreset::Educational => profile(-5, 3, 400, 700, 140),
        }
    }

    /// Chunk size for jobs using this preset: about three sentences
    pub fn chunk_chars(&self) -> usize {
        self.profile().max_sentence_chars * 3
    }
}

impl std::fmt::Display for SsmlPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SsmlPreset {
    type Err = InvalidInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        SsmlPreset::ALL
            .iter()
            .copied()
            .find(|preset| preset.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = SsmlPreset::ALL.iter().map(|p| p.as_str()).collect();
                InvalidInput(format!(
                    "unknown ssml_preset '{}', expected one of {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Chunker for a job.
///
/// Jobs without a preset use `default`; preset jobs use the preset's chunk
/// size, never above what the provider accepts per request.
pub fn chunker_for(default: Chunker, preset: Option<SsmlPreset>, provider_limit: usize) -> Chunker {
    match preset {
        Some(preset) => {
            Chunker::new(preset.chunk_chars().min(provider_limit)).unwrap_or(default)
        }
        None => default,
    }
}
