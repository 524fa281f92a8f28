//! Runtime configuration
//!
//! All fields have defaults matching the reference behavior, so a partial
//! JSON file (or none at all) is valid.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default interval between clock ticks in milliseconds.
const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Default end-of-media tolerance in seconds.
const DEFAULT_END_TOLERANCE_SECS: f64 = 0.1;

/// Default horizontal padding reserved for axis labels.
const DEFAULT_PADDING_PX: f64 = 40.0;

/// Default number of marker lanes rendered before clipping.
pub const DEFAULT_MAX_VISIBLE_LAYERS: usize = 5;

/// Shortest drag gesture that still produces a marker.
pub const DEFAULT_MIN_MARKER_SECS: f64 = 0.5;

/// Playback clock settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Period of the position broadcast / end-of-media check.
    pub tick_interval_ms: u64,

    /// Position within this distance of the end counts as end-of-media.
    pub end_tolerance_secs: f64,

    /// Rate applied to a freshly created clock.
    pub default_playback_rate: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            end_tolerance_secs: DEFAULT_END_TOLERANCE_SECS,
            default_playback_rate: 1.0,
        }
    }
}

impl ClockConfig {
    /// Tick period as a `Duration` (never zero).
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Marker timeline layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Left and right padding of the drawing surface.
    pub padding_px: f64,

    /// Lanes shown before the presentation layer clips.
    pub max_visible_layers: usize,

    /// Minimum drag length for a new marker.
    pub min_marker_secs: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding_px: DEFAULT_PADDING_PX,
            max_visible_layers: DEFAULT_MAX_VISIBLE_LAYERS,
            min_marker_secs: DEFAULT_MIN_MARKER_SECS,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub clock: ClockConfig,
    pub layout: LayoutConfig,
}

impl Config {
    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
