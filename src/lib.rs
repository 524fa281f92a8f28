//! Audiomark - audio annotation core
//!
//! Two leaf components back the annotation timeline:
//! 1. Playback clock - derives the playback position from a wall-clock
//!    anchor and owns play/pause/stop/seek/rate state and end-of-media
//!    detection
//! 2. Marker layout engine - assigns non-overlapping lanes to time-ranged
//!    markers and maps between seconds and pixels
//!
//! Around them sit the shared store, project export, and a small CLI.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod markers;
pub mod project;
pub mod store;

pub use error::{AudiomarkError, Result};
