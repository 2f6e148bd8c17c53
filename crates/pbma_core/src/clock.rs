//! # Simulation Clock
//!
//! Wall-time deltas between successive producer iterations.
//!
//! The time source is abstracted behind [`Clock`] so tests can drive time by
//! hand with [`ManualClock`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A monotonic time source.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real monotonic clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    current: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Creates a manual clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Advances the clock by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
    }

    /// Sets the clock to a specific instant, possibly in the past.
    pub fn set(&self, instant: Instant) {
        *self.current.lock() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}

/// Produces the delta time handed to each simulation step.
///
/// ## Usage
///
/// ```rust
/// use std::time::Duration;
/// use pbma_core::{ManualClock, SimulationClock};
///
/// let time = ManualClock::new();
/// let mut clock = SimulationClock::new(time.clone());
///
/// time.advance(Duration::from_millis(250));
/// assert!((clock.tick() - 0.25).abs() < 1e-6);
/// ```
#[derive(Debug)]
pub struct SimulationClock<C: Clock = SystemClock> {
    source: C,
    last: Instant,
}

impl<C: Clock> SimulationClock<C> {
    /// Creates a clock whose first tick measures from now.
    #[must_use]
    pub fn new(source: C) -> Self {
        let last = source.now();
        Self { source, last }
    }

    /// Returns the seconds elapsed since the previous tick (or creation).
    ///
    /// Never negative, even if the source steps backwards.
    pub fn tick(&mut self) -> f32 {
        let now = self.source.now();
        let delta = now.saturating_duration_since(self.last);
        self.last = now;
        delta.as_secs_f32()
    }

    /// Moves the baseline to now without reporting a delta.
    pub fn reset(&mut self) {
        self.last = self.source.now();
    }
}
