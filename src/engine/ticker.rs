//! Periodic clock ticker
//!
//! One cancelable tokio task per playback pass. It drives the clock's
//! position broadcast and end-of-media check, and stops itself once the
//! clock reports anything other than `Advanced`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::engine::clock::{PlaybackClock, TickOutcome};

/// Clock shared between the owner and its ticker task.
///
/// Transitions go through `update`, which drains the clock's events and
/// delivers them after the clock mutex is released. A separate delivery
/// lock keeps events from concurrent updates in clock order. Observers may
/// therefore take their own locks, and readers of the clock never wait on
/// an observer.
#[derive(Debug, Clone)]
pub struct SharedClock {
    clock: Arc<Mutex<PlaybackClock>>,
    delivery: Arc<Mutex<()>>,
}

impl SharedClock {
    pub fn new(clock: PlaybackClock) -> Self {
        Self {
            clock: Arc::new(Mutex::new(clock)),
            delivery: Arc::new(Mutex::new(())),
        }
    }

    /// Lock the clock for queries, recovering the guard if a holder panicked.
    ///
    /// Events raised through this guard stay queued until the next `update`.
    pub fn lock(&self) -> MutexGuard<'_, PlaybackClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a transition, then deliver its events with the clock unlocked.
    pub fn update<R>(&self, f: impl FnOnce(&mut PlaybackClock) -> R) -> R {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let (result, pending) = {
            let mut clock = self.lock();
            let result = f(&mut clock);
            (result, clock.take_events())
        };
        pending.dispatch();
        result
    }

    /// Handles to the clock still alive, including ticker tasks
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.clock)
    }
}

/// Handle to a running tick task. Dropping it cancels the task.
#[derive(Debug)]
pub struct ClockTicker {
    handle: JoinHandle<()>,
    generation: u64,
}

impl ClockTicker {
    /// Spawn a ticker for the clock's current generation.
    ///
    /// Returns `None` when called outside a tokio runtime; callers may then
    /// drive `PlaybackClock::tick` themselves.
    pub fn spawn(clock: SharedClock, period: Duration) -> Option<Self> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("[TICKER] No tokio runtime available, periodic check disabled");
                return None;
            }
        };

        let generation = clock.lock().generation();
        let handle = runtime.spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of an interval completes immediately
            ticks.tick().await;

            loop {
                ticks.tick().await;
                let outcome = clock.update(|clock| clock.tick_for(generation));
                match outcome {
                    TickOutcome::Advanced(_) => {}
                    other => {
                        debug!("[TICKER] Exiting (generation {}): {:?}", generation, other);
                        break;
                    }
                }
            }
        });

        debug!("[TICKER] Started for generation {}", generation);
        Some(Self { handle, generation })
    }

    /// Generation of the clock this ticker was started for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the task has exited on its own or been cancelled
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task.
    pub fn cancel(self) {
        // Drop performs the abort
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
