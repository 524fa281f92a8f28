//! Marker Layout Engine
//!
//! Pure functions from (markers, duration, surface width) to lane indices
//! and pixel geometry. Results are always recomputed from scratch.
//!
//! Lanes are assigned greedily: markers sorted by start (ties by id), each
//! placed on the lowest lane where it overlaps nothing. This is not optimal
//! interval coloring in general, but it is deterministic and independent of
//! input order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::markers::drag::{DragSelection, MarkerDraft};
use crate::markers::Marker;

/// Upper bound on gridlines for one axis.
pub const MAX_AXIS_TICKS: usize = 10_000;

/// Lane index per marker id
pub type LayerAssignment = BTreeMap<String, usize>;

/// Horizontal extent of a marker on the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelSpan {
    pub x: f64,
    pub width: f64,
}

/// One labeled gridline of the time axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeTick {
    pub time: f64,
    pub x: f64,
    pub label: String,
}

/// End used for layout. Malformed markers (`end <= start`) are zero-width.
fn effective_end(marker: &Marker) -> f64 {
    if marker.end > marker.start {
        marker.end
    } else {
        marker.start
    }
}

/// Assign a lane to every marker. Returns the assignment and the highest
/// lane used (0 when there are no markers).
///
/// # Example
/// ```
/// use audiomark::markers::{assign_layers, Marker};
/// let markers = vec![
///     Marker::with_id("id1", "a", 0.0, 10.0).unwrap(),
///     Marker::with_id("id2", "b", 5.0, 15.0).unwrap(),
///     Marker::with_id("id3", "c", 20.0, 25.0).unwrap(),
/// ];
/// let (layers, max_layer) = assign_layers(&markers);
/// assert_eq!(layers["id1"], 0);
/// assert_eq!(layers["id2"], 1);
/// assert_eq!(layers["id3"], 0);
/// assert_eq!(max_layer, 1);
/// ```
pub fn assign_layers(markers: &[Marker]) -> (LayerAssignment, usize) {
    let mut order: Vec<&Marker> = markers.iter().collect();
    order.sort_by(|a, b| a.start.total_cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    let mut lanes: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut assignment = LayerAssignment::new();

    for marker in order {
        let (start, end) = (marker.start, effective_end(marker));
        let free_lane = lanes.iter().position(|lane| {
            lane.iter()
                .all(|&(taken_start, taken_end)| !(start < taken_end && taken_start < end))
        });

        let layer = match free_lane {
            Some(layer) => layer,
            None => {
                lanes.push(Vec::new());
                lanes.len() - 1
            }
        };
        lanes[layer].push((start, end));
        assignment.insert(marker.id.clone(), layer);
    }

    (assignment, lanes.len().saturating_sub(1))
}

/// Gridline spacing for a given duration
pub fn tick_interval(duration: f64) -> f64 {
    if duration < 30.0 {
        5.0
    } else if duration < 60.0 {
        10.0
    } else if duration < 600.0 {
        30.0
    } else if duration < 1800.0 {
        60.0
    } else {
        300.0
    }
}

/// Format seconds as `m:ss`
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0).floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Ticks from 0 to the duration inclusive.
///
/// Very long durations widen the spacing in whole 5-minute steps so that at
/// most `MAX_AXIS_TICKS` intervals are produced.
pub fn time_axis_ticks(geometry: &TimelineGeometry) -> Vec<TimeTick> {
    let duration = if geometry.duration.is_finite() {
        geometry.duration.max(0.0)
    } else {
        0.0
    };
    let mut interval = tick_interval(duration);
    if duration / interval > MAX_AXIS_TICKS as f64 {
        interval = (duration / MAX_AXIS_TICKS as f64 / interval).ceil() * interval;
    }
    // Tolerance so that e.g. 30.0 / 10.0 still yields the final tick
    let count = (duration / interval + 1e-9).floor() as usize;

    (0..=count)
        .map(|i| {
            let time = i as f64 * interval;
            TimeTick {
                time,
                x: geometry.time_to_x(time),
                label: format_timestamp(time),
            }
        })
        .collect()
}

/// Mapping between seconds and pixels on a padded horizontal surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineGeometry {
    pub duration: f64,
    pub width: f64,
    pub padding: f64,
}

impl TimelineGeometry {
    pub fn new(duration: f64, width: f64, padding: f64) -> Self {
        Self {
            duration,
            width,
            padding,
        }
    }

    /// Zero duration or no room between the paddings
    pub fn is_degenerate(&self) -> bool {
        !(self.duration > 0.0) || !(self.width > 2.0 * self.padding)
    }

    /// Width available for the time axis
    pub fn usable_width(&self) -> f64 {
        (self.width - 2.0 * self.padding).max(0.0)
    }

    /// `P + (t / duration) * (W - 2P)`, or `P` when degenerate
    pub fn time_to_x(&self, t: f64) -> f64 {
        if self.is_degenerate() {
            return self.padding;
        }
        self.padding + (t / self.duration) * self.usable_width()
    }

    /// Inverse of `time_to_x` with `x` clamped into `[P, W - P]`, or 0 when degenerate
    pub fn x_to_time(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        let x = x.clamp(self.padding, self.width - self.padding);
        (x - self.padding) / self.usable_width() * self.duration
    }

    /// Pixel extent of a marker (zero width for malformed ranges)
    pub fn span_of(&self, marker: &Marker) -> PixelSpan {
        let x = self.time_to_x(marker.start);
        let end_x = self.time_to_x(effective_end(marker));
        PixelSpan {
            x,
            width: (end_x - x).max(0.0),
        }
    }
}

/// Full layout of one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub layer_of: LayerAssignment,
    pub max_layer: usize,
    /// Lanes the presentation layer should draw (capped)
    pub visible_layers: usize,
    pub marker_rects: BTreeMap<String, PixelSpan>,
    pub ticks: Vec<TimeTick>,
}

impl LayoutResult {
    pub fn layer(&self, id: &str) -> Option<usize> {
        self.layer_of.get(id).copied()
    }

    pub fn rect(&self, id: &str) -> Option<PixelSpan> {
        self.marker_rects.get(id).copied()
    }

    /// True if the marker sits on a lane beyond the visible cap
    pub fn is_clipped(&self, id: &str) -> bool {
        self.layer(id)
            .is_some_and(|layer| layer >= self.visible_layers)
    }
}

/// Layout entry point holding the surface settings
#[derive(Debug, Clone, Default)]
pub struct MarkerLayoutEngine {
    config: LayoutConfig,
}

impl MarkerLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn geometry(&self, duration: f64, width: f64) -> TimelineGeometry {
        TimelineGeometry::new(duration, width, self.config.padding_px)
    }

    /// Release a drag against the loaded duration using the configured
    /// minimum marker length.
    pub fn finish_drag(&self, drag: DragSelection, duration: f64) -> Option<MarkerDraft> {
        drag.release(duration, self.config.min_marker_secs)
    }

    /// Compute lanes, marker spans and axis ticks.
    pub fn layout(&self, markers: &[Marker], duration: f64, width: f64) -> LayoutResult {
        let geometry = self.geometry(duration, width);
        let (layer_of, max_layer) = assign_layers(markers);

        let marker_rects = markers
            .iter()
            .map(|m| (m.id.clone(), geometry.span_of(m)))
            .collect();

        let visible_layers = if markers.is_empty() {
            0
        } else {
            (max_layer + 1).min(self.config.max_visible_layers)
        };

        debug!(
            "[LAYOUT] {} markers on {} lanes ({} visible), degenerate={}",
            markers.len(),
            max_layer + 1,
            visible_layers,
            geometry.is_degenerate()
        );

        LayoutResult {
            layer_of,
            max_layer,
            visible_layers,
            marker_rects,
            ticks: time_axis_ticks(&geometry),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
