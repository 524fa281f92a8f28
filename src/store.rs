//! Shared application state
//!
//! `AppStore` holds duration, playback position, markers, selection and the
//! global controls. `SharedStore` makes it shareable and observable: the
//! playback clock writes into it as a `PlaybackObserver`, and the
//! presentation layer watches `PlaybackSnapshot`s.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::engine::clock::{ClockEvent, PlaybackObserver};
use crate::error::Result;
use crate::markers::{Marker, MarkerCollection, MarkerPatch};

/// Pitch shift bounds in semitones.
pub const PITCH_RANGE: (f64, f64) = (-12.0, 12.0);
/// Volume bounds.
pub const VOLUME_RANGE: (f64, f64) = (0.0, 1.0);
/// Playback rate bounds exposed to the user.
pub const PLAYBACK_RATE_RANGE: (f64, f64) = (0.5, 2.0);

/// Loaded-audio facts and the live playback values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioState {
    pub file_name: Option<String>,
    pub duration: f64,
    pub current_time: f64,
    pub is_playing: bool,
    pub is_loaded: bool,
    pub sample_rate: Option<u32>,
}

/// User-adjustable playback controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalControls {
    pub pitch: f64,
    pub volume: f64,
    pub playback_rate: f64,
}

impl Default for GlobalControls {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            volume: 1.0,
            playback_rate: 1.0,
        }
    }
}

/// What the presentation layer needs for the transport display
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub duration: f64,
    pub current_time: f64,
    pub is_playing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AppStore {
    pub audio: AudioState,
    pub markers: MarkerCollection,
    pub selected_marker_id: Option<String>,
    pub global_controls: GlobalControls,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Audio
    // ========================================================================

    /// Record a newly acquired source. Playback values are reset.
    pub fn set_audio_file(&mut self, file_name: Option<String>) {
        self.audio.is_loaded = file_name.is_some();
        self.audio.file_name = file_name;
        self.audio.current_time = 0.0;
        self.audio.is_playing = false;
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.audio.duration = duration.max(0.0);
    }

    pub fn set_sample_rate(&mut self, sample_rate: Option<u32>) {
        self.audio.sample_rate = sample_rate;
    }

    pub fn set_current_time(&mut self, time: f64) {
        self.audio.current_time = time;
    }

    pub fn set_is_playing(&mut self, is_playing: bool) {
        self.audio.is_playing = is_playing;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            duration: self.audio.duration,
            current_time: self.audio.current_time,
            is_playing: self.audio.is_playing,
        }
    }

    // ========================================================================
    // Markers
    // ========================================================================

    pub fn add_marker(&mut self, marker: Marker) -> Result<()> {
        self.markers.add(marker, self.audio.duration)
    }

    pub fn update_marker(&mut self, id: &str, patch: &MarkerPatch) -> Result<()> {
        self.markers.update(id, patch, self.audio.duration)?;
        Ok(())
    }

    /// Delete a marker, dropping the selection if it pointed at it.
    pub fn delete_marker(&mut self, id: &str) -> Result<Marker> {
        let removed = self.markers.remove(id)?;
        if self.selected_marker_id.as_deref() == Some(id) {
            self.selected_marker_id = None;
        }
        Ok(removed)
    }

    pub fn set_markers(&mut self, markers: Vec<Marker>) -> Result<()> {
        self.markers.replace_all(markers)?;
        self.clear_dangling_selection();
        Ok(())
    }

    /// Select a marker by id (`None` clears). Unknown ids clear the selection.
    pub fn select_marker(&mut self, id: Option<&str>) {
        self.selected_marker_id = id
            .filter(|id| self.markers.get(id).is_some())
            .map(str::to_string);
    }

    pub fn selected_marker(&self) -> Option<&Marker> {
        self.selected_marker_id
            .as_deref()
            .and_then(|id| self.markers.get(id))
    }

    fn clear_dangling_selection(&mut self) {
        if self.selected_marker().is_none() {
            self.selected_marker_id = None;
        }
    }

    // ========================================================================
    // Global Controls
    // ========================================================================

    pub fn set_pitch(&mut self, pitch: f64) {
        self.global_controls.pitch = clamp_control(pitch, PITCH_RANGE, 0.0);
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.global_controls.volume = clamp_control(volume, VOLUME_RANGE, 1.0);
    }

    pub fn set_playback_rate(&mut self, rate: f64) {
        self.global_controls.playback_rate = clamp_control(rate, PLAYBACK_RATE_RANGE, 1.0);
    }

    /// Mirror the rate the clock is actually running at, without clamping.
    pub fn record_playback_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.global_controls.playback_rate = rate;
        }
    }

    // ========================================================================
    // Project
    // ========================================================================

    /// Replace markers and controls from a saved project. Audio state is reset.
    pub fn load_project(&mut self, markers: Vec<Marker>, controls: GlobalControls) -> Result<()> {
        self.markers.replace_all(markers)?;
        self.set_pitch(controls.pitch);
        self.set_volume(controls.volume);
        self.set_playback_rate(controls.playback_rate);
        self.audio = AudioState::default();
        self.selected_marker_id = None;
        Ok(())
    }

    pub fn reset_project(&mut self) {
        *self = Self::default();
    }
}

fn clamp_control(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Thread-safe, observable handle to an `AppStore`.
#[derive(Debug, Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<AppStore>>,
    updates: Arc<watch::Sender<PlaybackSnapshot>>,
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new(AppStore::default())
    }
}

impl SharedStore {
    pub fn new(store: AppStore) -> Self {
        let (updates, _) = watch::channel(store.snapshot());
        Self {
            inner: Arc::new(RwLock::new(store)),
            updates: Arc::new(updates),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, AppStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the store and publish the resulting playback snapshot.
    pub fn update<R>(&self, f: impl FnOnce(&mut AppStore) -> R) -> R {
        let (result, snapshot) = {
            let mut store = self.write();
            let result = f(&mut store);
            (result, store.snapshot())
        };
        self.publish(snapshot);
        result
    }

    /// Receive every published playback snapshot
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.read().snapshot()
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: PlaybackSnapshot) {
        self.updates.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

impl PlaybackObserver for SharedStore {
    fn on_clock_event(&self, event: &ClockEvent) {
        match *event {
            ClockEvent::SourceLoaded { duration } => self.update(|store| {
                store.set_duration(duration);
                store.set_current_time(0.0);
                store.set_is_playing(false);
            }),
            ClockEvent::Position { time, is_playing } => self.update(|store| {
                store.set_current_time(time);
                store.set_is_playing(is_playing);
            }),
            ClockEvent::Ended { duration } => {
                debug!("[STORE] Playback ended at {:.3}s", duration);
                self.update(|store| {
                    store.set_current_time(duration);
                    store.set_is_playing(false);
                })
            }
            ClockEvent::RateChanged { rate } => {
                self.update(|store| store.record_playback_rate(rate))
            }
        }
    }
}
