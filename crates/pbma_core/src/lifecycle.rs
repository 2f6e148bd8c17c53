//! # Lifecycle State
//!
//! Lock-free flags shared by the producer thread and the host thread.
//!
//! ```text
//!   NotStarted ──run──> Paused <──pause/restart── Animating
//!                         │ ────start_animation────> │
//!                         └──────host loop exit──────┴──> Stopped
//! ```
//!
//! `running` is monotonic: once false it never becomes true again. Writes use
//! `Release` and reads use `Acquire`, so a thread that observes
//! `running == false` also observes everything written before `stop()`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Observable phase of a coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// `run()` has not been called yet.
    NotStarted,
    /// Running, simulation payload gated off.
    Paused,
    /// Running, simulation payload active.
    Animating,
    /// Terminal. No further callbacks fire.
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::Paused => "paused",
            Self::Animating => "animating",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// The `started`, `running` and `animating` flags.
#[derive(Debug)]
pub struct LifecycleState {
    started: AtomicBool,
    running: AtomicBool,
    animating: AtomicBool,
}

impl LifecycleState {
    /// Creates a running, paused, not yet started state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            running: AtomicBool::new(true),
            animating: AtomicBool::new(false),
        }
    }

    /// Marks the state as started. Returns `true` only on the first call.
    pub fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    /// Returns whether [`LifecycleState::mark_started`] has been called.
    #[inline]
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Returns `false` once [`LifecycleState::stop`] has been called.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns whether the simulation payload is active.
    #[inline]
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animating.load(Ordering::Acquire)
    }

    /// Activates the simulation payload. Idempotent.
    #[inline]
    pub fn start_animation(&self) {
        self.animating.store(true, Ordering::Release);
    }

    /// Gates the simulation payload off. Idempotent.
    #[inline]
    pub fn pause_animation(&self) {
        self.animating.store(false, Ordering::Release);
    }

    /// One-shot transition of `running` to false.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if !self.is_running() {
            Phase::Stopped
        } else if !self.has_started() {
            Phase::NotStarted
        } else if self.is_animating() {
            Phase::Animating
        } else {
            Phase::Paused
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}
