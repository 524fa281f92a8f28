//! Playback Clock for Audiomark
//!
//! Single authority for "is audio playing" and "what second are we at".
//! Position is never accumulated; it is derived on demand as
//! `paused_offset + (now - anchor_wall_time) * playback_rate` while playing,
//! and is `paused_offset` otherwise.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ClockConfig;
use crate::engine::time::{MonotonicTimeSource, TimeSource};
use crate::error::{AudiomarkError, Result};

/// Coarse playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Nothing playing, position at the start (or pinned at the end after end-of-media)
    #[default]
    Stopped,
    /// Position advancing with wall time
    Playing,
    /// Position frozen at `paused_offset`
    Paused,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Stopped => write!(f, "Stopped"),
            PlaybackStatus::Playing => write!(f, "Playing"),
            PlaybackStatus::Paused => write!(f, "Paused"),
        }
    }
}

/// Raw clock fields. `is_playing` selects which of `paused_offset` or
/// `anchor_wall_time + elapsed` is authoritative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    pub is_playing: bool,
    pub paused_offset: f64,
    pub anchor_wall_time: f64,
    pub playback_rate: f64,
}

/// Notifications broadcast to observers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    /// A new source was loaded; the clock is back at `Stopped`/0.
    SourceLoaded { duration: f64 },
    /// Emitted on every transition and every advancing tick.
    Position { time: f64, is_playing: bool },
    /// Natural end of media. Emitted exactly once per playback pass.
    Ended { duration: f64 },
    RateChanged { rate: f64 },
}

/// Receives clock events.
///
/// Events are queued by the clock and delivered by whoever drains them
/// (`SharedClock::update` or `PlaybackClock::flush_events`), never while the
/// clock is locked.
pub trait PlaybackObserver: Send + Sync {
    fn on_clock_event(&self, event: &ClockEvent);
}

/// Events drained from a clock, ready to be delivered in order.
#[must_use = "events are lost unless dispatched"]
pub struct PendingEvents {
    events: Vec<ClockEvent>,
    observers: Vec<Arc<dyn PlaybackObserver>>,
}

impl PendingEvents {
    pub fn events(&self) -> &[ClockEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Deliver every event to every observer, oldest first.
    pub fn dispatch(self) {
        for event in &self.events {
            for observer in &self.observers {
                observer.on_clock_event(event);
            }
        }
    }
}

impl fmt::Debug for PendingEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingEvents")
            .field("events", &self.events)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Result of one periodic check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not playing; nothing to report.
    Idle,
    /// Still playing at the given position.
    Advanced(f64),
    /// End-of-media reached on this tick.
    Ended(f64),
    /// The tick belongs to a previous source or session.
    Stale,
}

/// Wall-clock derived playback position with play/pause/stop/seek/rate control.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use audiomark::config::ClockConfig;
/// use audiomark::engine::{ManualTimeSource, PlaybackClock};
///
/// let time = ManualTimeSource::new();
/// let mut clock = PlaybackClock::with_time_source(&ClockConfig::default(), Arc::new(time.clone()));
/// clock.load_source(30.0).unwrap();
/// clock.play().unwrap();
/// time.advance(2.0);
/// assert_eq!(clock.position(), 2.0);
/// ```
pub struct PlaybackClock {
    state: ClockState,
    status: PlaybackStatus,
    duration: Option<f64>,
    end_tolerance: f64,
    generation: u64,
    time_source: Arc<dyn TimeSource>,
    observers: Vec<Arc<dyn PlaybackObserver>>,
    pending: Vec<ClockEvent>,
}

impl fmt::Debug for PlaybackClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackClock")
            .field("state", &self.state)
            .field("status", &self.status)
            .field("duration", &self.duration)
            .field("end_tolerance", &self.end_tolerance)
            .field("generation", &self.generation)
            .field("observers", &self.observers.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(&ClockConfig::default())
    }
}

impl PlaybackClock {
    /// Create a clock driven by the monotonic system clock
    pub fn new(config: &ClockConfig) -> Self {
        Self::with_time_source(config, Arc::new(MonotonicTimeSource::new()))
    }

    /// Create a clock driven by an arbitrary time source
    pub fn with_time_source(config: &ClockConfig, time_source: Arc<dyn TimeSource>) -> Self {
        let rate = if is_valid_rate(config.default_playback_rate) {
            config.default_playback_rate
        } else {
            1.0
        };
        let now = time_source.now();
        Self {
            state: ClockState {
                is_playing: false,
                paused_offset: 0.0,
                anchor_wall_time: now,
                playback_rate: rate,
            },
            status: PlaybackStatus::Stopped,
            duration: None,
            end_tolerance: config.end_tolerance_secs.max(0.0),
            generation: 0,
            time_source,
            observers: Vec::new(),
            pending: Vec::new(),
        }
    }

    // ========================================================================
    // Source Lifecycle
    // ========================================================================

    /// Attach a new source of `duration` seconds and reset to `Stopped`/0.
    ///
    /// Invalidates any tick scheduled against the previous source.
    pub fn load_source(&mut self, duration: f64) -> Result<()> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(AudiomarkError::InvalidAudio {
                reason: format!("invalid duration {}", duration),
            });
        }

        self.duration = Some(duration);
        self.reset_transport();
        self.generation += 1;
        info!("[CLOCK] Source loaded, duration {:.3}s", duration);

        self.notify(ClockEvent::SourceLoaded { duration });
        self.notify(ClockEvent::Position {
            time: 0.0,
            is_playing: false,
        });
        Ok(())
    }

    /// Detach the current source.
    pub fn unload(&mut self) {
        self.duration = None;
        self.reset_transport();
        self.generation += 1;
        debug!("[CLOCK] Source unloaded");
    }

    fn reset_transport(&mut self) {
        self.state.is_playing = false;
        self.state.paused_offset = 0.0;
        self.state.anchor_wall_time = self.time_source.now();
        self.status = PlaybackStatus::Stopped;
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start or resume playback from the current offset.
    ///
    /// No-op while already playing. After a natural end-of-media the next
    /// `play()` starts over from 0.
    pub fn play(&mut self) -> Result<()> {
        let duration = self.duration.ok_or(AudiomarkError::NoSourceLoaded)?;

        if self.state.is_playing {
            debug!("[CLOCK] Already playing");
            return Ok(());
        }

        if self.is_finished() {
            self.state.paused_offset = 0.0;
        }

        self.state.anchor_wall_time = self.time_source.now();
        self.state.is_playing = true;
        self.status = PlaybackStatus::Playing;
        debug!("[CLOCK] Play from {:.3}s", self.state.paused_offset);

        self.notify(ClockEvent::Position {
            time: self.state.paused_offset,
            is_playing: true,
        });
        Ok(())
    }

    /// Freeze the position. No-op unless playing.
    pub fn pause(&mut self) {
        if !self.state.is_playing {
            debug!("[CLOCK] Pause ignored, not playing");
            return;
        }

        self.settle();
        self.state.is_playing = false;
        self.status = PlaybackStatus::Paused;
        debug!("[CLOCK] Paused at {:.3}s", self.state.paused_offset);

        self.notify(ClockEvent::Position {
            time: self.state.paused_offset,
            is_playing: false,
        });
    }

    /// Stop and rewind to 0. Always succeeds.
    pub fn stop(&mut self) {
        self.reset_transport();
        self.generation += 1;
        debug!("[CLOCK] Stopped, position reset to 0");

        self.notify(ClockEvent::Position {
            time: 0.0,
            is_playing: false,
        });
    }

    /// Jump to `t` (clamped to `[0, duration]`), preserving the play state.
    ///
    /// While playing this is a seamless in-place jump: `is_playing` never
    /// reads false in between.
    pub fn seek(&mut self, t: f64) -> Result<f64> {
        if self.duration.is_none() {
            return Err(AudiomarkError::NoSourceLoaded);
        }
        if !t.is_finite() {
            return Err(AudiomarkError::InvalidTime { value: t });
        }

        let target = self.clamp_to_source(t);
        self.state.paused_offset = target;
        self.state.anchor_wall_time = self.time_source.now();

        if !self.state.is_playing && !(self.status == PlaybackStatus::Stopped && target == 0.0) {
            self.status = PlaybackStatus::Paused;
        }
        debug!("[CLOCK] Seek to {:.3}s ({})", target, self.status);

        self.notify(ClockEvent::Position {
            time: target,
            is_playing: self.state.is_playing,
        });
        Ok(target)
    }

    /// Change the speed at which future wall time advances the position.
    ///
    /// Elapsed time is settled into the offset first, so the position does
    /// not jump.
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !is_valid_rate(rate) {
            return Err(AudiomarkError::InvalidPlaybackRate { rate });
        }

        if self.state.is_playing {
            self.settle();
        }
        self.state.playback_rate = rate;
        debug!("[CLOCK] Playback rate set to {}", rate);

        self.notify(ClockEvent::RateChanged { rate });
        Ok(())
    }

    /// Fold elapsed wall time into `paused_offset` and re-anchor at now.
    fn settle(&mut self) {
        let now = self.time_source.now();
        self.state.paused_offset = self.clamp_to_source(self.live_position(now));
        self.state.anchor_wall_time = now;
    }

    // ========================================================================
    // End-of-Media Detection
    // ========================================================================

    /// Periodic check against the current generation.
    pub fn tick(&mut self) -> TickOutcome {
        self.tick_for(self.generation)
    }

    /// Periodic check on behalf of a timer started at `generation`.
    ///
    /// Broadcasts the position while playing, and performs the end-of-media
    /// transition once the position is within tolerance of the end.
    pub fn tick_for(&mut self, generation: u64) -> TickOutcome {
        if generation != self.generation {
            return TickOutcome::Stale;
        }
        let duration = match self.duration {
            Some(duration) if self.state.is_playing => duration,
            _ => return TickOutcome::Idle,
        };

        let position = self.position();
        if position >= duration - self.end_tolerance {
            self.finish_media(duration);
            return TickOutcome::Ended(duration);
        }

        self.notify(ClockEvent::Position {
            time: position,
            is_playing: true,
        });
        TickOutcome::Advanced(position)
    }

    /// Secondary end-of-track signal from the audio backend.
    ///
    /// Returns `true` if this call performed the end transition.
    pub fn on_backend_ended(&mut self) -> bool {
        match self.duration {
            Some(duration) if self.state.is_playing => {
                self.finish_media(duration);
                true
            }
            _ => false,
        }
    }

    fn finish_media(&mut self, duration: f64) {
        self.state.is_playing = false;
        self.state.paused_offset = duration;
        self.state.anchor_wall_time = self.time_source.now();
        self.status = PlaybackStatus::Stopped;
        info!("[CLOCK] End of media at {:.3}s", duration);

        self.notify(ClockEvent::Position {
            time: duration,
            is_playing: false,
        });
        self.notify(ClockEvent::Ended { duration });
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current position in seconds, always within `[0, duration]`.
    pub fn position(&self) -> f64 {
        if self.state.is_playing {
            self.clamp_to_source(self.live_position(self.time_source.now()))
        } else {
            self.clamp_to_source(self.state.paused_offset)
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Snapshot of the raw clock fields
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Duration of the loaded source, if any
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_loaded(&self) -> bool {
        self.duration.is_some()
    }

    /// True after end-of-media, until the next play, seek, stop or load.
    pub fn is_finished(&self) -> bool {
        self.status == PlaybackStatus::Stopped
            && !self.state.is_playing
            && self
                .duration
                .is_some_and(|duration| self.state.paused_offset >= duration)
    }

    pub fn playback_rate(&self) -> f64 {
        self.state.playback_rate
    }

    /// Bumped on every load, unload and stop. Timers compare against it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn subscribe(&mut self, observer: Arc<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    /// Drain queued events together with the observers that should get them.
    pub fn take_events(&mut self) -> PendingEvents {
        PendingEvents {
            events: std::mem::take(&mut self.pending),
            observers: self.observers.clone(),
        }
    }

    /// Deliver queued events right away. For clocks that are not shared.
    pub fn flush_events(&mut self) {
        self.take_events().dispatch();
    }

    fn notify(&mut self, event: ClockEvent) {
        if !self.observers.is_empty() {
            self.pending.push(event);
        }
    }

    fn live_position(&self, now: f64) -> f64 {
        let elapsed = (now - self.state.anchor_wall_time).max(0.0);
        self.state.paused_offset + elapsed * self.state.playback_rate
    }

    fn clamp_to_source(&self, t: f64) -> f64 {
        t.clamp(0.0, self.duration.unwrap_or(0.0))
    }
}

fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

// ============================================================================
// Unit Tests
// ============================================================================
