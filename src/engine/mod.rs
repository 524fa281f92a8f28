//! Playback Engine Module
//!
//! - Wall-clock derived playback clock
//! - Cancelable periodic ticker
//! - Audio backend boundary and file helpers
//! - Player tying them together

pub mod backend;
pub mod clock;
pub mod io;
pub mod player;
pub mod ticker;
pub mod time;

pub use backend::{AudioBackend, WavBackend};
pub use clock::{
    ClockEvent, ClockState, PendingEvents, PlaybackClock, PlaybackObserver, PlaybackStatus,
    TickOutcome,
};
pub use io::{probe_wav, probe_wav_bytes, validate_audio_file, AudioFormat, WavInfo};
pub use player::Player;
pub use ticker::{ClockTicker, SharedClock};
pub use time::{ManualTimeSource, MonotonicTimeSource, TimeSource};
