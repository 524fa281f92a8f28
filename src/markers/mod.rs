//! Markers Module
//!
//! Labeled time ranges over the audio timeline, the collection that owns
//! them, and the layout engine that places them on screen.

pub mod drag;
pub mod layout;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AudiomarkError, Result};

pub use drag::{DragSelection, MarkerDraft};
pub use layout::{
    assign_layers, format_timestamp, tick_interval, time_axis_ticks, LayerAssignment,
    LayoutResult, MarkerLayoutEngine, PixelSpan, TimeTick, TimelineGeometry,
};

/// A named, optionally colored time range. `start < end` always holds for
/// markers created through this module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    #[serde(rename = "name", alias = "label")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Marker {
    /// Create a marker with a fresh UUID.
    ///
    /// # Example
    /// ```
    /// use audiomark::markers::Marker;
    /// let marker = Marker::new("Chorus", 12.0, 30.5).unwrap();
    /// assert_eq!(marker.length(), 18.5);
    /// assert!(Marker::new("Backwards", 5.0, 2.0).is_err());
    /// ```
    pub fn new(label: impl Into<String>, start: f64, end: f64) -> Result<Self> {
        Self::with_id(Uuid::new_v4().to_string(), label, start, end)
    }

    /// Create a marker with an explicit id
    pub fn with_id(
        id: impl Into<String>,
        label: impl Into<String>,
        start: f64,
        end: f64,
    ) -> Result<Self> {
        let marker = Self {
            id: id.into(),
            start,
            end,
            label: label.into(),
            color: None,
            notes: None,
        };
        marker.check_order()?;
        Ok(marker)
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open overlap: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Marker) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if `t` falls inside `[start, end)`
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Check `0 <= start < end` with finite bounds.
    pub fn check_order(&self) -> Result<()> {
        if self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.start < self.end
        {
            Ok(())
        } else {
            Err(AudiomarkError::InvalidRange {
                start: self.start,
                end: self.end,
                duration: f64::NAN,
            })
        }
    }

    /// Check `0 <= start < end <= duration`.
    pub fn validate(&self, duration: f64) -> Result<()> {
        let in_bounds = self.check_order().is_ok() && self.end <= duration;
        if in_bounds {
            Ok(())
        } else {
            Err(AudiomarkError::InvalidRange {
                start: self.start,
                end: self.end,
                duration,
            })
        }
    }
}

/// Partial update applied by `MarkerCollection::update`.
///
/// For `color`/`notes`, `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPatch {
    pub label: Option<String>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub color: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl MarkerPatch {
    pub fn rename(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn retime(start: f64, end: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    fn apply_to(&self, marker: &Marker) -> Marker {
        let mut updated = marker.clone();
        if let Some(label) = &self.label {
            updated.label = label.clone();
        }
        if let Some(start) = self.start {
            updated.start = start;
        }
        if let Some(end) = self.end {
            updated.end = end;
        }
        if let Some(color) = &self.color {
            updated.color = color.clone();
        }
        if let Some(notes) = &self.notes {
            updated.notes = notes.clone();
        }
        updated
    }
}

/// Ordered set of markers with unique ids. The only place markers change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerCollection {
    markers: Vec<Marker>,
}

impl MarkerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker that fits inside `[0, duration]`.
    pub fn add(&mut self, marker: Marker, duration: f64) -> Result<()> {
        if let Err(e) = marker.validate(duration) {
            warn!("[MARKERS] Rejected marker '{}': {}", marker.label, e);
            return Err(e);
        }
        if self.get(&marker.id).is_some() {
            return Err(AudiomarkError::DuplicateMarker { id: marker.id });
        }

        debug!(
            "[MARKERS] Added '{}' [{:.3}, {:.3}]",
            marker.label, marker.start, marker.end
        );
        self.markers.push(marker);
        Ok(())
    }

    /// Apply `patch` to the marker `id`. Nothing changes if the result is invalid.
    pub fn update(&mut self, id: &str, patch: &MarkerPatch, duration: f64) -> Result<&Marker> {
        let index = self.index_of(id)?;
        let updated = patch.apply_to(&self.markers[index]);
        updated.validate(duration)?;

        self.markers[index] = updated;
        debug!("[MARKERS] Updated '{}'", id);
        Ok(&self.markers[index])
    }

    pub fn remove(&mut self, id: &str) -> Result<Marker> {
        let index = self.index_of(id)?;
        debug!("[MARKERS] Removed '{}'", id);
        Ok(self.markers.remove(index))
    }

    /// Replace the whole set (project load). Checks ordering and id uniqueness.
    pub fn replace_all(&mut self, markers: Vec<Marker>) -> Result<()> {
        {
            let mut seen = HashSet::new();
            for marker in &markers {
                marker.check_order()?;
                if !seen.insert(marker.id.as_str()) {
                    return Err(AudiomarkError::DuplicateMarker {
                        id: marker.id.clone(),
                    });
                }
            }
        }
        self.markers = markers;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn as_slice(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers whose range contains `t`
    pub fn markers_at(&self, t: f64) -> Vec<&Marker> {
        self.markers.iter().filter(|m| m.contains(t)).collect()
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.markers
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| AudiomarkError::MarkerNotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str, start: f64, end: f64) -> Marker {
        Marker::with_id(id, id.to_uppercase(), start, end).unwrap()
    }

    #[test]
    fn test_new_generates_unique_ids() {
        let a = Marker::new("a", 0.0, 1.0).unwrap();
        let b = Marker::new("b", 0.0, 1.0).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_rejects_inverted_or_empty_range() {
        assert!(matches!(
            Marker::new("x", 3.0, 3.0),
            Err(AudiomarkError::InvalidRange { .. })
        ));
        assert!(Marker::new("x", 4.0, 3.0).is_err());
        assert!(Marker::new("x", -1.0, 3.0).is_err());
        assert!(Marker::new("x", 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = marker("a", 0.0, 10.0);
        let b = marker("b", 10.0, 12.0);
        let c = marker("c", 9.0, 11.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_add_validates_against_duration() {
        let mut markers = MarkerCollection::new();
        markers.add(marker("a", 0.0, 10.0), 30.0).unwrap();
        assert!(matches!(
            markers.add(marker("b", 25.0, 31.0), 30.0),
            Err(AudiomarkError::InvalidRange { .. })
        ));
        assert!(matches!(
            markers.add(marker("a", 1.0, 2.0), 30.0),
            Err(AudiomarkError::DuplicateMarker { .. })
        ));
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let mut markers = MarkerCollection::new();
        markers.add(marker("a", 2.0, 4.0), 30.0).unwrap();

        let patch = MarkerPatch {
            label: Some("Renamed".to_string()),
            end: Some(1.0),
            ..MarkerPatch::default()
        };
        assert!(markers.update("a", &patch, 30.0).is_err());
        assert_eq!(markers.get("a").unwrap().label, "A");

        let updated = markers
            .update("a", &MarkerPatch::retime(5.0, 8.0), 30.0)
            .unwrap();
        assert_eq!((updated.start, updated.end), (5.0, 8.0));
    }

    #[test]
    fn test_update_clears_color() {
        let mut markers = MarkerCollection::new();
        markers
            .add(marker("a", 2.0, 4.0).with_color("#ff0000"), 30.0)
            .unwrap();
        let patch = MarkerPatch {
            color: Some(None),
            ..MarkerPatch::default()
        };
        markers.update("a", &patch, 30.0).unwrap();
        assert_eq!(markers.get("a").unwrap().color, None);
    }

    #[test]
    fn test_remove_and_missing() {
        let mut markers = MarkerCollection::new();
        markers.add(marker("a", 0.0, 1.0), 30.0).unwrap();
        assert_eq!(markers.remove("a").unwrap().id, "a");
        assert!(matches!(
            markers.remove("a"),
            Err(AudiomarkError::MarkerNotFound { .. })
        ));
        assert!(markers.is_empty());
    }

    #[test]
    fn test_replace_all_rejects_duplicates() {
        let mut markers = MarkerCollection::new();
        let result = markers.replace_all(vec![marker("a", 0.0, 1.0), marker("a", 2.0, 3.0)]);
        assert!(result.is_err());
        assert!(markers.is_empty());
    }

    #[test]
    fn test_markers_at() {
        let mut markers = MarkerCollection::new();
        markers.add(marker("a", 0.0, 10.0), 30.0).unwrap();
        markers.add(marker("b", 5.0, 15.0), 30.0).unwrap();
        let ids: Vec<_> = markers.markers_at(10.0).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_serializes_label_as_name() {
        let json = serde_json::to_value(marker("a", 0.0, 1.0).with_notes("intro")).unwrap();
        assert_eq!(json["name"], "A");
        assert_eq!(json["notes"], "intro");
        assert!(json.get("color").is_none());

        let parsed: Marker =
            serde_json::from_str(r#"{"id":"z","start":1,"end":2,"label":"Verse"}"#).unwrap();
        assert_eq!(parsed.label, "Verse");
    }
}
