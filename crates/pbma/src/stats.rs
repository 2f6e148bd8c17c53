//! # Loop Statistics
//!
//! Counters updated by both threads with relaxed atomics. Read them through
//! [`LoopStats::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the producer and the host thread.
#[derive(Debug, Default)]
pub struct LoopStats {
    steps: AtomicU64,
    idle_steps: AtomicU64,
    clamped_deltas: AtomicU64,
    frames_presented: AtomicU64,
    frames_skipped: AtomicU64,
    restarts: AtomicU64,
}

impl LoopStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_idle_step(&self) {
        self.idle_steps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_clamped_delta(&self) {
        self.clamped_deltas.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_presented(&self) {
        self.frames_presented.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_restart(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a plain copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            steps: self.steps.load(Ordering::Relaxed),
            idle_steps: self.idle_steps.load(Ordering::Relaxed),
            clamped_deltas: self.clamped_deltas.load(Ordering::Relaxed),
            frames_presented: self.frames_presented.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LoopStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStatsSnapshot {
    /// Producer iterations that ran the simulation payload.
    pub steps: u64,
    /// Producer iterations that ran the handshake with the payload gated off.
    pub idle_steps: u64,
    /// Steps whose delta time was clamped.
    pub clamped_deltas: u64,
    /// Frames that consumed a world state.
    pub frames_presented: u64,
    /// Frames that skipped the handshake because animation was paused.
    pub frames_skipped: u64,
    /// Restarts applied.
    pub restarts: u64,
}

impl LoopStatsSnapshot {
    /// Total frames the host ticked through the coordinator.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames_presented + self.frames_skipped
    }
}
