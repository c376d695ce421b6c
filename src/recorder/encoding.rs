//! Recording encodings and negotiation.
//!
//! The recorder walks `ENCODING_PREFERENCE` and picks the first entry the
//! capture stream supports, falling back to the default when nothing
//! matches. All encodings share the WAV container.

use cpal::SampleFormat;
use serde::{Deserialize, Serialize};

/// Encoding of the finalized artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingEncoding {
    /// 16-bit integer PCM. Compact, universally readable.
    Pcm16,

    /// 32-bit float PCM, written only when the device delivers float
    /// samples natively.
    Float32,
}

/// Preference order: compact PCM first, raw float last.
pub const ENCODING_PREFERENCE: &[RecordingEncoding] =
    &[RecordingEncoding::Pcm16, RecordingEncoding::Float32];

pub const DEFAULT_ENCODING: RecordingEncoding = RecordingEncoding::Pcm16;

impl RecordingEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            RecordingEncoding::Pcm16 => "pcm16",
            RecordingEncoding::Float32 => "float32",
        }
    }

    /// File extension for the artifact container.
    pub fn extension(&self) -> &'static str {
        "wav"
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            RecordingEncoding::Pcm16 => 2,
            RecordingEncoding::Float32 => 4,
        }
    }

    fn is_supported(&self, format: SampleFormat) -> bool {
        match self {
            RecordingEncoding::Pcm16 => {
                matches!(format, SampleFormat::I16 | SampleFormat::U16)
            }
            RecordingEncoding::Float32 => matches!(format, SampleFormat::F32),
        }
    }

    pub fn wav_spec(&self, sample_rate: u32, channels: u16) -> hound::WavSpec {
        match self {
            RecordingEncoding::Pcm16 => hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            RecordingEncoding::Float32 => hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
        }
    }
}

impl std::fmt::Display for RecordingEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Select the best-supported encoding for a capture stream's sample format.
pub fn negotiate_encoding(format: SampleFormat) -> RecordingEncoding {
    ENCODING_PREFERENCE
        .iter()
        .copied()
        .find(|encoding| encoding.is_supported(format))
        .unwrap_or(DEFAULT_ENCODING)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_leads_with_compact_pcm() {
        assert_eq!(ENCODING_PREFERENCE[0], RecordingEncoding::Pcm16);
    }

    #[test]
    fn test_integer_devices_negotiate_pcm16() {
        assert_eq!(negotiate_encoding(SampleFormat::I16), RecordingEncoding::Pcm16);
        assert_eq!(negotiate_encoding(SampleFormat::U16), RecordingEncoding::Pcm16);
    }

    #[test]
    fn test_float_devices_negotiate_float_wav() {
        assert_eq!(negotiate_encoding(SampleFormat::F32), RecordingEncoding::Float32);
    }

    #[test]
    fn test_unknown_formats_fall_back_to_default() {
        assert_eq!(negotiate_encoding(SampleFormat::I32), DEFAULT_ENCODING);
    }

    #[test]
    fn test_wav_spec_matches_encoding() {
        let spec = RecordingEncoding::Pcm16.wav_spec(44_100, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let spec = RecordingEncoding::Float32.wav_spec(48_000, 2);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        assert_eq!(spec.channels, 2);
    }
}
