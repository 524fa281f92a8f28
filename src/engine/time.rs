//! Wall-clock sources for the playback clock
//!
//! The clock never stores a running position; it derives one from an anchor
//! captured from a `TimeSource`. Tests substitute `ManualTimeSource`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// A free-running, monotonic source of seconds.
pub trait TimeSource: Send + Sync {
    /// Current time in seconds since an arbitrary fixed origin.
    fn now(&self) -> f64;
}

/// `Instant`-backed time source.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimeSource {
    origin: Instant,
}

impl Default for MonotonicTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for MonotonicTimeSource {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven time source. Clones share the same underlying time.
///
/// # Example
/// ```
/// use audiomark::engine::{ManualTimeSource, TimeSource};
/// let time = ManualTimeSource::new();
/// time.advance(1.5);
/// assert_eq!(time.now(), 1.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    seconds: Arc<Mutex<f64>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `secs` (negative values are ignored).
    pub fn advance(&self, secs: f64) {
        if secs > 0.0 {
            let mut now = self.seconds.lock().unwrap_or_else(PoisonError::into_inner);
            *now += secs;
        }
    }

    /// Jump to an absolute time. Callers are responsible for monotonicity.
    pub fn set(&self, secs: f64) {
        *self.seconds.lock().unwrap_or_else(PoisonError::into_inner) = secs;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> f64 {
        *self.seconds.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
