//! # Scalar Trace
//!
//! Bounded history of a scalar quantity, newest last. Once full, each push
//! evicts the oldest sample.

use std::collections::VecDeque;

/// Capacity-bounded sample history.
#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl Trace {
    /// Creates an empty trace keeping at most `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Trace capacity must be at least 1");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Drops all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Returns the newest sample.
    #[must_use]
    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    /// Iterates samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    /// Number of samples held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no samples are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
