use super::error::AssemblyError;

/// Concatenate per-chunk MP3 streams in order.
///
/// MP3 frames are self-delimiting, so raw concatenation of well-formed
/// streams is itself a playable stream. No re-encoding is done.
pub fn assemble<B: AsRef<[u8]>>(chunks: &[B]) -> Result<Vec<u8>, AssemblyError> {
    if chunks.is_empty() {
        return Err(AssemblyError::Empty);
    }

    for (index, chunk) in chunks.iter().enumerate() {
        validate_mp3_chunk(chunk.as_ref())
            .map_err(|reason| AssemblyError::MalformedChunk { index, reason })?;
    }

    let total: usize = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut output = Vec::with_capacity(total);
    for chunk in chunks {
        output.extend_from_slice(chunk.as_ref());
    }

    tracing::debug!(
        chunk_count = chunks.len(),
        audio_size = output.len(),
        "Audio chunks assembled"
    );

    Ok(output)
}

/// A chunk must start with an ID3v2 tag or an MPEG audio frame sync.
fn validate_mp3_chunk(bytes: &[u8]) -> Result<(), String> {
    match bytes {
        [] => Err("chunk is empty".to_string()),
        [b'I', b'D', b'3', ..] => Ok(()),
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => Ok(()),
        _ => Err(format!(
            "missing MP3 frame header (starts with {:02X?})",
            &bytes[..bytes.len().min(4)]
        )),
    }
}

/// Bitrates in kbps by bitrate index, per MPEG version and layer
const BITRATES_V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const BITRATES_V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

#[derive(Debug, Clone, Copy, PartialEq)]
enum MpegVersion {
    V1,
    V2,
    V25,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameHeader {
    length: usize,
    samples: u32,
    sample_rate: u32,
}

fn parse_frame_header(bytes: &[u8]) -> Option<FrameHeader> {
    let [b0, b1, b2, ..] = *bytes else {
        return None;
    };
    if b0 != 0xFF || b1 & 0xE0 != 0xE0 {
        return None;
    }

    let version = match (b1 >> 3) & 0x03 {
        0 => MpegVersion::V25,
        2 => MpegVersion::V2,
        3 => MpegVersion::V1,
        _ => return None,
    };
    let layer = match (b1 >> 1) & 0x03 {
        1 => 3,
        2 => 2,
        3 => 1,
        _ => return None,
    };

    let bitrate_index = (b2 >> 4) as usize;
    if bitrate_index == 0 || bitrate_index == 15 {
        return None;
    }
    let table = match (version, layer) {
        (MpegVersion::V1, 1) => &BITRATES_V1_L1,
        (MpegVersion::V1, 2) => &BITRATES_V1_L2,
        (MpegVersion::V1, _) => &BITRATES_V1_L3,
        (_, 1) => &BITRATES_V2_L1,
        _ => &BITRATES_V2_L23,
    };
    let bitrate = table[bitrate_index] * 1000;

    let base_rate = match (b2 >> 2) & 0x03 {
        0 => 44_100,
        1 => 48_000,
        2 => 32_000,
        _ => return None,
    };
    let sample_rate = match version {
        MpegVersion::V1 => base_rate,
        MpegVersion::V2 => base_rate / 2,
        MpegVersion::V25 => base_rate / 4,
    };
    let padding = ((b2 >> 1) & 0x01) as u32;

    let (length, samples) = match (version, layer) {
        (_, 1) => ((12 * bitrate / sample_rate + padding) * 4, 384),
        (MpegVersion::V1, _) | (_, 2) => (144 * bitrate / sample_rate + padding, 1152),
        _ => (72 * bitrate / sample_rate + padding, 576),
    };

    Some(FrameHeader {
        length: length as usize,
        samples,
        sample_rate,
    })
}

/// Total size of an ID3v2 tag starting at `bytes`, if one does
fn id3_tag_len(bytes: &[u8]) -> Option<usize> {
    let [b'I', b'D', b'3', major, _, flags, s0, s1, s2, s3, ..] = *bytes else {
        return None;
    };
    if major == 0xFF || [s0, s1, s2, s3].iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    let size = (s0 as usize) << 21 | (s1 as usize) << 14 | (s2 as usize) << 7 | s3 as usize;
    let footer = if flags & 0x10 != 0 { 10 } else { 0 };
    Some(10 + size + footer)
}

/// Playback length of an MP3 stream in seconds, summed over its frames.
///
/// ID3v2 tags are skipped wherever they appear, so concatenated streams
/// are measured as a whole. Bytes that are neither are stepped over one at
/// a time. `None` when no frame is found.
pub fn mp3_duration_seconds(bytes: &[u8]) -> Option<f64> {
    let mut offset = 0;
    let mut seconds = 0.0;
    let mut frames = 0usize;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if let Some(tag_len) = id3_tag_len(rest) {
            offset += tag_len;
            continue;
        }
        match parse_frame_header(rest) {
            Some(frame) if frame.length > 0 && frame.length <= rest.len() => {
                seconds += frame.samples as f64 / frame.sample_rate as f64;
                frames += 1;
                offset += frame.length;
            }
            _ => offset += 1,
        }
    }

    (frames > 0).then_some(seconds)
}
