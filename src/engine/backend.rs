//! Audio backend boundary
//!
//! The backend is the actuator that turns bytes into sound. The playback
//! clock keeps its own position estimate and only uses the backend's end
//! notification as a secondary signal.

use tracing::debug;

use crate::engine::io::{probe_wav_bytes, WavInfo};
use crate::error::{AudiomarkError, Result};

/// Decoding/playback engine driven by the `Player`.
pub trait AudioBackend {
    /// Decode `bytes` and return the duration in seconds.
    fn load(&mut self, bytes: &[u8]) -> Result<f64>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn stop(&mut self);

    fn seek(&mut self, seconds: f64);

    fn set_playback_rate(&mut self, _rate: f64) {}

    /// The engine's own (typically coarse) position report
    fn raw_position(&self) -> f64;

    /// True once the engine has reported reaching the end of the source.
    fn has_ended(&self) -> bool;
}

/// Silent backend for WAV data decoded with `hound`.
///
/// Tracks transport state and header information without producing output.
/// Hosts with a real audio device provide their own `AudioBackend`.
#[derive(Debug, Clone)]
pub struct WavBackend {
    info: Option<WavInfo>,
    playing: bool,
    position: f64,
    rate: f64,
    ended: bool,
}

impl Default for WavBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WavBackend {
    pub fn new() -> Self {
        Self {
            info: None,
            playing: false,
            position: 0.0,
            rate: 1.0,
            ended: false,
        }
    }

    /// Header of the loaded source
    pub fn info(&self) -> Option<&WavInfo> {
        self.info.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn playback_rate(&self) -> f64 {
        self.rate
    }

    /// Signal that the output stream ran dry.
    pub fn mark_ended(&mut self) {
        if let Some(info) = &self.info {
            self.position = info.duration_secs;
        }
        self.playing = false;
        self.ended = true;
    }
}

impl AudioBackend for WavBackend {
    fn load(&mut self, bytes: &[u8]) -> Result<f64> {
        let info = probe_wav_bytes(bytes)?;
        if info.num_frames == 0 {
            return Err(AudiomarkError::InvalidAudio {
                reason: "audio contains no samples".to_string(),
            });
        }

        debug!(
            "[BACKEND] Loaded WAV: {} Hz, {} ch, {:.3}s",
            info.sample_rate, info.channels, info.duration_secs
        );
        self.info = Some(info);
        self.playing = false;
        self.position = 0.0;
        self.ended = false;
        Ok(info.duration_secs)
    }

    fn play(&mut self) -> Result<()> {
        if self.info.is_none() {
            return Err(AudiomarkError::NoSourceLoaded);
        }
        self.playing = true;
        self.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.playing = false;
        self.position = 0.0;
        self.ended = false;
    }

    fn seek(&mut self, seconds: f64) {
        let duration = self.info.map(|info| info.duration_secs).unwrap_or(0.0);
        self.position = seconds.clamp(0.0, duration);
        self.ended = false;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn raw_position(&self) -> f64 {
        self.position
    }

    fn has_ended(&self) -> bool {
        self.ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::io::generate_test_tone;

    #[test]
    fn test_load_reports_duration() {
        let bytes = generate_test_tone(220.0, 2.0, 8000).unwrap();
        let mut backend = WavBackend::new();
        let duration = backend.load(&bytes).unwrap();
        assert!((duration - 2.0).abs() < 1e-9);
        assert_eq!(backend.info().unwrap().sample_rate, 8000);
    }

    #[test]
    fn test_play_requires_source() {
        let mut backend = WavBackend::new();
        assert!(matches!(backend.play(), Err(AudiomarkError::NoSourceLoaded)));
    }

    #[test]
    fn test_seek_clamps_and_clears_end() {
        let bytes = generate_test_tone(220.0, 1.0, 8000).unwrap();
        let mut backend = WavBackend::new();
        backend.load(&bytes).unwrap();
        backend.play().unwrap();
        backend.mark_ended();
        assert!(backend.has_ended());
        assert_eq!(backend.raw_position(), 1.0);

        backend.seek(5.0);
        assert_eq!(backend.raw_position(), 1.0);
        assert!(!backend.has_ended());
    }

    #[test]
    fn test_empty_wav_rejected() {
        let bytes = generate_test_tone(220.0, 0.0, 8000).unwrap();
        let mut backend = WavBackend::new();
        assert!(backend.load(&bytes).is_err());
    }
}
