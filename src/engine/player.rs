//! Player: backend + clock + ticker lifecycle
//!
//! Every operation applies the clock transition first and only then drives
//! the backend, so `is_playing()`/`position()` always reflect the latest call
//! even if the backend has not caught up yet. At most one ticker exists;
//! it is torn down on pause, stop, end-of-media, reload and drop.
//!
//! The ticker can finish a playback pass on its own. The backend is brought
//! back in line on the next `play` (rewound before restarting) or
//! `poll_backend` (paused).

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ClockConfig;
use crate::engine::backend::AudioBackend;
use crate::engine::clock::{PlaybackClock, PlaybackObserver, PlaybackStatus};
use crate::engine::ticker::{ClockTicker, SharedClock};
use crate::engine::time::TimeSource;
use crate::error::{AudiomarkError, Result};

pub struct Player<B: AudioBackend> {
    backend: B,
    clock: SharedClock,
    ticker: Option<ClockTicker>,
    config: ClockConfig,
}

impl<B: AudioBackend + std::fmt::Debug> std::fmt::Debug for Player<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("backend", &self.backend)
            .field("clock", &self.clock)
            .field("ticker", &self.ticker)
            .finish()
    }
}

impl<B: AudioBackend> Player<B> {
    pub fn new(backend: B, config: ClockConfig) -> Self {
        let clock = PlaybackClock::new(&config);
        Self::with_clock(backend, clock, config)
    }

    /// Build a player around a clock driven by a custom time source
    pub fn with_time_source(backend: B, config: ClockConfig, time: Arc<dyn TimeSource>) -> Self {
        let clock = PlaybackClock::with_time_source(&config, time);
        Self::with_clock(backend, clock, config)
    }

    fn with_clock(backend: B, clock: PlaybackClock, config: ClockConfig) -> Self {
        Self {
            backend,
            clock: SharedClock::new(clock),
            ticker: None,
            config,
        }
    }

    // ========================================================================
    // Source
    // ========================================================================

    /// Decode and attach a new source. Returns its duration.
    ///
    /// Any ticker from the previous source is cancelled before the backend
    /// is touched. On decode failure the clock is left unloaded.
    pub fn load(&mut self, bytes: &[u8]) -> Result<f64> {
        self.cancel_ticker();
        self.backend.stop();

        let duration = match self.backend.load(bytes) {
            Ok(duration) => duration,
            Err(e) => {
                warn!("[PLAYER] Load failed: {}", e);
                self.clock.update(|clock| clock.unload());
                return Err(e);
            }
        };

        self.clock.update(|clock| {
            let loaded = clock.load_source(duration);
            if loaded.is_err() {
                clock.unload();
            }
            loaded
        })?;
        info!("[PLAYER] Loaded source ({:.3}s)", duration);
        Ok(duration)
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start or resume playback. The backend is positioned at the clock's
    /// start offset first, so a restart after end-of-media begins at 0 on both.
    pub fn play(&mut self) -> Result<()> {
        let (was_playing, finished, start) = self.clock.update(|clock| {
            let was_playing = clock.is_playing();
            let finished = clock.is_finished();
            clock.play()?;
            Ok::<_, AudiomarkError>((was_playing, finished, clock.position()))
        })?;
        if was_playing {
            return Ok(());
        }

        if finished {
            debug!("[PLAYER] Restarting after end of media");
            self.backend.stop();
        }
        self.backend.seek(start);

        self.cancel_ticker();
        self.ticker = ClockTicker::spawn(self.clock.clone(), self.config.tick_interval());

        if let Err(e) = self.backend.play() {
            warn!("[PLAYER] Backend failed to start: {}", e);
            self.clock.update(|clock| clock.pause());
            self.cancel_ticker();
            return Err(e);
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        self.clock.update(|clock| clock.pause());
        self.cancel_ticker();
        self.backend.pause();
    }

    pub fn stop(&mut self) {
        self.clock.update(|clock| clock.stop());
        self.cancel_ticker();
        self.backend.stop();
    }

    /// Seek to `t`; returns the clamped target.
    pub fn seek(&mut self, t: f64) -> Result<f64> {
        let target = self.clock.update(|clock| clock.seek(t))?;
        self.backend.seek(target);
        Ok(target)
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.clock.update(|clock| clock.set_playback_rate(rate))?;
        self.backend.set_playback_rate(rate);
        Ok(())
    }

    /// Reconcile the backend with the clock's end-of-media.
    ///
    /// Forwards the backend's own end notification to the clock, and pauses
    /// the backend once the ticker has finished the pass first. Returns
    /// `true` if this call ended playback.
    pub fn poll_backend(&mut self) -> bool {
        if self.backend.has_ended() {
            let ended = self.clock.update(|clock| clock.on_backend_ended());
            if ended {
                self.cancel_ticker();
            }
            return ended;
        }

        if self.clock.lock().is_finished() {
            self.cancel_ticker();
            self.backend.pause();
        }
        false
    }

    /// Tear down the ticker and stop the backend.
    pub fn dispose(&mut self) {
        self.cancel_ticker();
        self.backend.stop();
        self.clock.update(|clock| clock.unload());
    }

    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn position(&self) -> f64 {
        self.clock.lock().position()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.lock().is_playing()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.clock.lock().status()
    }

    pub fn duration(&self) -> Option<f64> {
        self.clock.lock().duration()
    }

    /// True while a ticker task is alive
    pub fn has_active_ticker(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Shared handle to the clock (for observers and manual ticking)
    pub fn clock(&self) -> SharedClock {
        self.clock.clone()
    }

    pub fn subscribe(&self, observer: Arc<dyn PlaybackObserver>) {
        self.clock.lock().subscribe(observer);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: AudioBackend> Drop for Player<B> {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::WavBackend;
    use crate::engine::io::generate_test_tone;
    use crate::engine::clock::TickOutcome;
    use crate::engine::time::ManualTimeSource;

    /// Backend that can be told to fail on play
    #[derive(Debug, Default)]
    struct FlakyBackend {
        fail_play: bool,
        plays: usize,
    }

    impl AudioBackend for FlakyBackend {
        fn load(&mut self, _bytes: &[u8]) -> Result<f64> {
            Ok(8.0)
        }
        fn play(&mut self) -> Result<()> {
            self.plays += 1;
            if self.fail_play {
                Err(AudiomarkError::InvalidAudio {
                    reason: "device unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
        fn pause(&mut self) {}
        fn stop(&mut self) {}
        fn seek(&mut self, _seconds: f64) {}
        fn raw_position(&self) -> f64 {
            0.0
        }
        fn has_ended(&self) -> bool {
            false
        }
    }

    fn wav_player() -> (Player<WavBackend>, ManualTimeSource) {
        let time = ManualTimeSource::new();
        let player = Player::with_time_source(
            WavBackend::new(),
            ClockConfig::default(),
            Arc::new(time.clone()),
        );
        (player, time)
    }

    #[test]
    fn test_play_before_load_fails() {
        let (mut player, _time) = wav_player();
        assert!(matches!(player.play(), Err(AudiomarkError::NoSourceLoaded)));
        assert!(!player.backend().is_playing());
    }

    #[test]
    fn test_load_and_play_without_runtime() {
        let (mut player, time) = wav_player();
        let bytes = generate_test_tone(440.0, 3.0, 8000).unwrap();
        assert_eq!(player.load(&bytes).unwrap(), 3.0);

        player.play().unwrap();
        assert!(player.is_playing());
        assert!(player.backend().is_playing());
        assert!(!player.has_active_ticker());

        time.advance(1.25);
        assert_eq!(player.position(), 1.25);
    }

    #[test]
    fn test_failed_load_unloads_clock() {
        let (mut player, _time) = wav_player();
        let bytes = generate_test_tone(440.0, 3.0, 8000).unwrap();
        player.load(&bytes).unwrap();
        assert!(player.load(b"garbage").is_err());
        assert_eq!(player.duration(), None);
    }

    #[test]
    fn test_seek_drives_backend() {
        let (mut player, _time) = wav_player();
        let bytes = generate_test_tone(440.0, 3.0, 8000).unwrap();
        player.load(&bytes).unwrap();
        assert_eq!(player.seek(10.0).unwrap(), 3.0);
        assert_eq!(player.backend().raw_position(), 3.0);
    }

    #[test]
    fn test_backend_failure_rolls_back() {
        let time = ManualTimeSource::new();
        let backend = FlakyBackend {
            fail_play: true,
            plays: 0,
        };
        let mut player =
            Player::with_time_source(backend, ClockConfig::default(), Arc::new(time.clone()));
        player.load(&[]).unwrap();
        player.seek(2.0).unwrap();

        assert!(player.play().is_err());
        assert!(!player.is_playing());
        assert_eq!(player.position(), 2.0);
    }

    #[test]
    fn test_repeated_play_drives_backend_once() {
        let time = ManualTimeSource::new();
        let mut player = Player::with_time_source(
            FlakyBackend::default(),
            ClockConfig::default(),
            Arc::new(time),
        );
        player.load(&[]).unwrap();
        player.play().unwrap();
        player.play().unwrap();
        assert_eq!(player.backend().plays, 1);
    }

    #[test]
    fn test_backend_end_notification() {
        let (mut player, time) = wav_player();
        let bytes = generate_test_tone(440.0, 3.0, 8000).unwrap();
        player.load(&bytes).unwrap();
        player.play().unwrap();
        time.advance(1.0);
        assert!(!player.poll_backend());

        player.backend_mut().mark_ended();
        assert!(player.poll_backend());
        assert!(!player.is_playing());
        assert_eq!(player.position(), 3.0);
        assert!(!player.poll_backend());
    }

    #[test]
    fn test_restart_after_end_rewinds_backend() {
        let (mut player, time) = wav_player();
        let bytes = generate_test_tone(440.0, 3.0, 8000).unwrap();
        player.load(&bytes).unwrap();
        player.seek(2.0).unwrap();
        player.play().unwrap();

        time.advance(1.0);
        let outcome = player.clock().update(|clock| clock.tick());
        assert_eq!(outcome, TickOutcome::Ended(3.0));
        assert!(!player.is_playing());

        player.play().unwrap();
        assert_eq!(player.position(), 0.0);
        assert_eq!(player.backend().raw_position(), 0.0);
        assert!(player.backend().is_playing());
    }

    #[test]
    fn test_poll_pauses_backend_after_clock_end() {
        let (mut player, time) = wav_player();
        let bytes = generate_test_tone(440.0, 3.0, 8000).unwrap();
        player.load(&bytes).unwrap();
        player.play().unwrap();

        time.advance(3.0);
        player.clock().update(|clock| clock.tick());
        assert!(player.backend().is_playing());

        assert!(!player.poll_backend());
        assert!(!player.backend().is_playing());
        assert_eq!(player.position(), 3.0);
    }

    #[tokio::test]
    async fn test_ticker_lifecycle() {
        let (mut player, _time) = wav_player();
        let bytes = generate_test_tone(440.0, 3.0, 8000).unwrap();
        player.load(&bytes).unwrap();

        player.play().unwrap();
        assert!(player.has_active_ticker());

        player.pause();
        assert!(!player.has_active_ticker());

        player.play().unwrap();
        assert!(player.has_active_ticker());
        player.load(&bytes).unwrap();
        assert!(!player.has_active_ticker());
        assert!(!player.is_playing());

        player.play().unwrap();
        player.stop();
        assert!(!player.has_active_ticker());
        assert_eq!(player.position(), 0.0);
    }
}
