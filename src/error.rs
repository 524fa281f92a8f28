//! Error handling for Audiomark
//!
//! Clock failures are reported synchronously and leave state untouched.
//! Layout degeneracies are never errors; they are clamped away.

use thiserror::Error;

use crate::engine::io::AudioFormat;

/// Result type alias for Audiomark operations
pub type Result<T> = std::result::Result<T, AudiomarkError>;

/// Main error type for Audiomark operations
#[derive(Error, Debug)]
pub enum AudiomarkError {
    // Playback Errors
    #[error("No audio source loaded")]
    NoSourceLoaded,

    #[error("Invalid playback rate: {rate} (must be finite and > 0)")]
    InvalidPlaybackRate { rate: f64 },

    #[error("Invalid time value: {value}")]
    InvalidTime { value: f64 },

    // Marker Errors
    #[error("Invalid marker range: [{start}, {end}] (duration {duration})")]
    InvalidRange { start: f64, end: f64, duration: f64 },

    #[error("Marker not found: {id}")]
    MarkerNotFound { id: String },

    #[error("Marker already exists: {id}")]
    DuplicateMarker { id: String },

    // Source Errors
    #[error("Invalid audio: {reason}")]
    InvalidAudio { reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("File too large: {size_bytes} bytes (maximum {max_bytes})")]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AudiomarkError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AudiomarkError::NoSourceLoaded => "NO_SOURCE_LOADED",
            AudiomarkError::InvalidPlaybackRate { .. } => "INVALID_PLAYBACK_RATE",
            AudiomarkError::InvalidTime { .. } => "INVALID_TIME",
            AudiomarkError::InvalidRange { .. } => "INVALID_RANGE",
            AudiomarkError::MarkerNotFound { .. } => "MARKER_NOT_FOUND",
            AudiomarkError::DuplicateMarker { .. } => "DUPLICATE_MARKER",
            AudiomarkError::InvalidAudio { .. } => "INVALID_AUDIO",
            AudiomarkError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AudiomarkError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AudiomarkError::Io(_) => "IO_ERROR",
            AudiomarkError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can simply retry after user action
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AudiomarkError::Io(_) | AudiomarkError::Serialization(_)
        )
    }

    /// Get a short message suitable for a transient notification
    pub fn friendly_message(&self) -> String {
        match self {
            AudiomarkError::NoSourceLoaded => {
                "Load an audio file before using the playback controls.".to_string()
            }
            AudiomarkError::InvalidRange { start, end, .. } => format!(
                "A marker needs an end after its start ({:.2}s to {:.2}s is not valid).",
                start, end
            ),
            AudiomarkError::InvalidPlaybackRate { rate } => {
                format!("Playback speed {} is not allowed.", rate)
            }
            AudiomarkError::UnsupportedFormat { format } => {
                let supported: Vec<String> = AudioFormat::ALL
                    .iter()
                    .map(|f| f.extension().to_uppercase())
                    .collect();
                format!(
                    "'{}' files are not supported. Try one of: {}.",
                    format,
                    supported.join(", ")
                )
            }
            AudiomarkError::FileTooLarge { size_bytes, max_bytes } => format!(
                "This file is {:.2}MB; the limit is {}MB.",
                *size_bytes as f64 / 1024.0 / 1024.0,
                max_bytes / 1024 / 1024
            ),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AudiomarkError::NoSourceLoaded.error_code(), "NO_SOURCE_LOADED");
        let err = AudiomarkError::InvalidRange {
            start: 5.0,
            end: 2.0,
            duration: 10.0,
        };
        assert_eq!(err.error_code(), "INVALID_RANGE");
    }

    #[test]
    fn test_friendly_messages() {
        let msg = AudiomarkError::NoSourceLoaded.friendly_message();
        assert!(msg.contains("Load an audio file"));

        let err = AudiomarkError::FileTooLarge {
            size_bytes: 600 * 1024 * 1024,
            max_bytes: 500 * 1024 * 1024,
        };
        assert!(err.friendly_message().contains("500MB"));
    }

    #[test]
    fn test_unsupported_format_lists_every_format() {
        let msg = AudiomarkError::UnsupportedFormat {
            format: "mid".to_string(),
        }
        .friendly_message();
        for format in AudioFormat::ALL {
            assert!(msg.contains(&format.extension().to_uppercase()), "{}", msg);
        }
    }

    #[test]
    fn test_recoverability() {
        assert!(AudiomarkError::NoSourceLoaded.is_recoverable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(!AudiomarkError::from(io).is_recoverable());
    }
}
