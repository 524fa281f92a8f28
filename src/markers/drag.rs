//! Drag-to-select marker creation
//!
//! While the pointer is down the selection is `(anchor, current)`. On release
//! the range is normalized and clamped to the loaded audio; gestures shorter
//! than the minimum are treated as clicks and produce nothing.

use crate::error::Result;
use crate::markers::Marker;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSelection {
    anchor: f64,
    current: f64,
}

impl DragSelection {
    /// Pointer down at `anchor` seconds
    pub fn begin(anchor: f64) -> Self {
        Self {
            anchor,
            current: anchor,
        }
    }

    /// Pointer moved to `current` seconds
    pub fn update(&mut self, current: f64) {
        self.current = current;
    }

    pub fn anchor(&self) -> f64 {
        self.anchor
    }

    /// Normalized `(start, end)` of the in-progress selection
    pub fn preview(&self) -> (f64, f64) {
        (self.anchor.min(self.current), self.anchor.max(self.current))
    }

    /// Pointer up over audio of `duration` seconds. Returns a draft awaiting
    /// a label, or `None` for a click or a drag entirely outside the audio.
    ///
    /// # Example
    /// ```
    /// use audiomark::markers::DragSelection;
    /// let mut drag = DragSelection::begin(10.0);
    /// drag.update(10.3);
    /// assert!(drag.release(60.0, 0.5).is_none());
    /// ```
    pub fn release(self, duration: f64, min_length: f64) -> Option<MarkerDraft> {
        if !duration.is_finite() || duration <= 0.0 {
            return None;
        }
        let (start, end) = self.preview();
        if start.is_nan() || end.is_nan() {
            return None;
        }
        let (start, end) = (start.clamp(0.0, duration), end.clamp(0.0, duration));
        // Zero-length ranges are never valid markers
        if end - start < min_length || end <= start {
            return None;
        }
        Some(MarkerDraft { start, end })
    }
}

/// A committed range waiting for the user to confirm its label
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerDraft {
    pub start: f64,
    pub end: f64,
}

impl MarkerDraft {
    /// Turn the draft into a marker with the chosen label
    pub fn confirm(self, label: impl Into<String>) -> Result<Marker> {
        Marker::new(label, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_gesture_discarded() {
        let mut drag = DragSelection::begin(10.0);
        drag.update(10.3);
        assert!(drag.release(60.0, 0.5).is_none());
    }

    #[test]
    fn test_backwards_drag_normalized() {
        let mut drag = DragSelection::begin(8.0);
        drag.update(3.5);
        assert_eq!(drag.preview(), (3.5, 8.0));

        let draft = drag.release(60.0, 0.5).unwrap();
        assert_eq!(draft, MarkerDraft { start: 3.5, end: 8.0 });

        let marker = draft.confirm("Bridge").unwrap();
        assert_eq!(marker.label, "Bridge");
        assert_eq!((marker.start, marker.end), (3.5, 8.0));
    }

    #[test]
    fn test_exact_minimum_accepted() {
        let mut drag = DragSelection::begin(1.0);
        drag.update(1.5);
        assert!(drag.release(60.0, 0.5).is_some());
    }

    #[test]
    fn test_click_without_move() {
        assert!(DragSelection::begin(4.0).release(60.0, 0.5).is_none());
    }

    #[test]
    fn test_drag_past_edges_clamped() {
        let mut drag = DragSelection::begin(-1.0);
        drag.update(3.0);
        let draft = drag.release(30.0, 0.5).unwrap();
        assert_eq!(draft, MarkerDraft { start: 0.0, end: 3.0 });
        assert_eq!(draft.confirm("Intro").unwrap().start, 0.0);

        let mut drag = DragSelection::begin(28.0);
        drag.update(45.0);
        assert_eq!(drag.release(30.0, 0.5).unwrap().end, 30.0);
    }

    #[test]
    fn test_drag_outside_audio_discarded() {
        let mut drag = DragSelection::begin(40.0);
        drag.update(50.0);
        assert!(drag.release(30.0, 0.5).is_none());
        assert!(DragSelection::begin(1.0).release(0.0, 0.5).is_none());
    }
}
