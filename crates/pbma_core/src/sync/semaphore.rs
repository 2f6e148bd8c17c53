//! # Counting Semaphore
//!
//! A monitor (lock + condition variable) around a non-negative counter.
//!
//! ## Thread Safety
//!
//! - `acquire`: blocks until the count is positive, then decrements it
//! - `release`: increments the count and wakes one waiter
//!
//! The wait predicate is re-checked after every wakeup, so a `release` that
//! lands before the waiter parks is never lost.

use parking_lot::{Condvar, Mutex};

/// Blocking, thread-safe integer gate.
///
/// ## Usage
///
/// ```rust
/// use pbma_core::Semaphore;
///
/// let gate = Semaphore::new(1);
/// gate.acquire();
/// assert_eq!(gate.available_permits(), 0);
/// gate.release();
/// assert_eq!(gate.available_permits(), 1);
/// ```
#[derive(Debug)]
pub struct Semaphore {
    /// Current number of permits.
    count: Mutex<usize>,
    /// Signalled whenever `count` is incremented.
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `initial` permits.
    #[must_use]
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.available.wait(&mut count);
        }
        *count -= 1;
    }

    /// Returns one permit and wakes a blocked `acquire`, if any.
    pub fn release(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.available.notify_one();
    }

    /// Takes a permit that is returned when the permit guard is dropped.
    ///
    /// Blocks exactly like [`Semaphore::acquire`].
    #[must_use = "dropping the permit releases it immediately"]
    pub fn access(&self) -> SemaphorePermit<'_> {
        self.acquire();
        SemaphorePermit { semaphore: self }
    }

    /// Returns the number of permits currently available.
    ///
    /// The value may be stale by the time the caller looks at it.
    #[inline]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        *self.count.lock()
    }
}

/// A held permit. Dropping it releases the permit back to its semaphore.
#[derive(Debug)]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
