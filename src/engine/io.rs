//! Audio file acquisition helpers
//!
//! Format allow-list, size validation and WAV probing. Decoding of
//! compressed formats is left to whichever backend the host provides.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AudiomarkError, Result};

/// Largest accepted source file (500 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 500 * 1024 * 1024;

/// Supported audio container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
    Flac,
    M4a,
    Aac,
    Webm,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 7] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::Ogg,
        AudioFormat::Flac,
        AudioFormat::M4a,
        AudioFormat::Aac,
        AudioFormat::Webm,
    ];

    /// Detect the format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "ogg" => Some(AudioFormat::Ogg),
            "flac" => Some(AudioFormat::Flac),
            "m4a" => Some(AudioFormat::M4a),
            "aac" => Some(AudioFormat::Aac),
            "webm" => Some(AudioFormat::Webm),
            _ => None,
        }
    }

    /// Detect the format from a file name or path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
            AudioFormat::M4a => "m4a",
            AudioFormat::Aac => "aac",
            AudioFormat::Webm => "webm",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Validate a candidate source by name and size before reading it.
pub fn validate_audio_file(file_name: &str, size_bytes: u64) -> Result<AudioFormat> {
    if size_bytes > MAX_FILE_SIZE_BYTES {
        return Err(AudiomarkError::FileTooLarge {
            size_bytes,
            max_bytes: MAX_FILE_SIZE_BYTES,
        });
    }

    if file_name.trim().is_empty() {
        return Err(AudiomarkError::InvalidAudio {
            reason: "file has no name".to_string(),
        });
    }

    let path = Path::new(file_name);
    AudioFormat::from_path(path).ok_or_else(|| AudiomarkError::UnsupportedFormat {
        format: path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })
}

/// Basic properties of decoded WAV data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Frames per channel
    pub num_frames: u64,
    pub duration_secs: f64,
}

/// Read the WAV header from in-memory bytes.
pub fn probe_wav_bytes(bytes: &[u8]) -> Result<WavInfo> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| {
        AudiomarkError::InvalidAudio {
            reason: format!("Failed to read WAV data: {}", e),
        }
    })?;

    let spec = reader.spec();
    let num_frames = reader.duration() as u64;
    if spec.sample_rate == 0 {
        return Err(AudiomarkError::InvalidAudio {
            reason: "sample rate is zero".to_string(),
        });
    }

    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs: num_frames as f64 / spec.sample_rate as f64,
    })
}

/// Read the WAV header from a file.
pub fn probe_wav(path: &Path) -> Result<WavInfo> {
    let bytes = std::fs::read(path)?;
    probe_wav_bytes(&bytes)
}

/// Encode a mono sine tone as 16-bit WAV bytes.
pub fn generate_test_tone(frequency: f64, duration_secs: f64, sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(|e| {
            AudiomarkError::InvalidAudio {
                reason: format!("Failed to create WAV writer: {}", e),
            }
        })?;

        let num_samples = (duration_secs * sample_rate as f64) as usize;
        for i in 0..num_samples {
            let t = i as f64 / sample_rate as f64;
            let sample = (2.0 * std::f64::consts::PI * frequency * t).sin() * 0.5;
            writer
                .write_sample((sample * i16::MAX as f64) as i16)
                .map_err(|e| AudiomarkError::InvalidAudio {
                    reason: format!("Failed to write sample: {}", e),
                })?;
        }

        writer.finalize().map_err(|e| AudiomarkError::InvalidAudio {
            reason: format!("Failed to finalize WAV: {}", e),
        })?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioFormat::from_extension("MP3"), Some(AudioFormat::Mp3));
        assert_eq!(
            AudioFormat::from_path(Path::new("take_01.Flac")),
            Some(AudioFormat::Flac)
        );
        assert_eq!(AudioFormat::from_extension("txt"), None);
        for format in AudioFormat::ALL {
            assert_eq!(AudioFormat::from_extension(format.extension()), Some(format));
        }
    }

    #[test]
    fn test_validate_accepts_supported() {
        assert_eq!(
            validate_audio_file("interview.wav", 1024).unwrap(),
            AudioFormat::Wav
        );
    }

    #[test]
    fn test_validate_rejects_unsupported_extension() {
        let err = validate_audio_file("notes.txt", 10).unwrap_err();
        match err {
            AudiomarkError::UnsupportedFormat { format } => assert_eq!(format, "txt"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_large_and_unnamed() {
        assert!(matches!(
            validate_audio_file("big.wav", MAX_FILE_SIZE_BYTES + 1),
            Err(AudiomarkError::FileTooLarge { .. })
        ));
        assert!(matches!(
            validate_audio_file("   ", 10),
            Err(AudiomarkError::InvalidAudio { .. })
        ));
    }

    #[test]
    fn test_probe_generated_tone() {
        let bytes = generate_test_tone(440.0, 1.5, 8000).unwrap();
        let info = probe_wav_bytes(&bytes).unwrap();
        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.num_frames, 12000);
        assert_relative_eq!(info.duration_secs, 1.5);
    }

    #[test]
    fn test_probe_rejects_garbage() {
        assert!(probe_wav_bytes(b"definitely not audio").is_err());
    }
}
