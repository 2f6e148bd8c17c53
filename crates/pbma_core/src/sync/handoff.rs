//! # One-Slot Handoff
//!
//! The bounded-buffer pattern specialized to a buffer of capacity one.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │          Handoff<T>         │
//!                    │                             │
//!                    │  empty(1)  full(0)  mutex(1)│
//!                    │       │       │       │     │
//!                    │  ┌────┴───────┴───────┴──┐  │
//!                    │  │       slot: T         │  │
//!                    │  └───────────────────────┘  │
//!                    └─────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//!      ┌──────────────┐ ┌────────────┐ ┌──────────────┐
//!      │ ProduceGuard │ │ConsumeGuard│ │ExclusiveGuard│
//!      │ (simulation) │ │ (present)  │ │  (restart)   │
//!      └──────────────┘ └────────────┘ └──────────────┘
//! ```
//!
//! ## Gate Accounting
//!
//! | Guard            | Acquires        | Releases on drop                  |
//! |------------------|-----------------|-----------------------------------|
//! | `ProduceGuard`   | `empty`,`mutex` | `mutex`, then `full` if committed, else `empty` |
//! | `ConsumeGuard`   | `full`, `mutex` | `mutex`, then `empty`             |
//! | `ExclusiveGuard` | `mutex`         | `mutex`                           |
//!
//! The slot itself sits behind an uncontended lock so the borrow checker sees
//! the exclusivity that the `mutex` gate already provides.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use super::semaphore::Semaphore;

/// Snapshot of the three gate counts, in protocol order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateCounts {
    /// Permits on the `empty` gate (1 while the slot is vacant).
    pub empty: usize,
    /// Permits on the `full` gate (1 while a state is pending).
    pub full: usize,
    /// Permits on the `mutex` gate (1 while nobody is inside).
    pub mutex: usize,
}

impl GateCounts {
    /// Counts of a freshly created handoff.
    pub const INITIAL: Self = Self {
        empty: 1,
        full: 0,
        mutex: 1,
    };
}

/// One-slot buffer shared by exactly one producer and one consumer.
///
/// ## Usage
///
/// ```rust
/// use pbma_core::Handoff;
///
/// let handoff = Handoff::new(Vec::<f32>::new());
///
/// // Producer thread
/// let mut slot = handoff.begin_produce().unwrap();
/// slot.push(1.0);
/// slot.commit();
///
/// // Consumer thread
/// let slot = handoff.begin_consume().unwrap();
/// assert_eq!(slot.len(), 1);
/// ```
#[derive(Debug)]
pub struct Handoff<T> {
    empty: Semaphore,
    full: Semaphore,
    mutex: Semaphore,
    slot: Mutex<T>,
    /// Set by the one-shot shutdown release.
    poisoned: AtomicBool,
    /// Set when the producer can no longer publish.
    abandoned: AtomicBool,
}

impl<T> Handoff<T> {
    /// Creates a vacant handoff around `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            empty: Semaphore::new(1),
            full: Semaphore::new(0),
            mutex: Semaphore::new(1),
            slot: Mutex::new(initial),
            poisoned: AtomicBool::new(false),
            abandoned: AtomicBool::new(false),
        }
    }

    /// Enters the producer critical section.
    ///
    /// Blocks on `empty` until the consumer has drained the previous state,
    /// then on `mutex`. Call [`ProduceGuard::commit`] to publish the write.
    ///
    /// Returns `None` once the handoff is poisoned. The gates taken on the
    /// way in are handed back and the slot is not touched.
    #[must_use = "dropping the guard without commit returns the slot as vacant"]
    pub fn begin_produce(&self) -> Option<ProduceGuard<'_, T>> {
        self.empty.acquire();
        self.mutex.acquire();

        if self.is_poisoned() {
            self.mutex.release();
            self.empty.release();
            return None;
        }

        Some(ProduceGuard {
            slot: self.slot.lock(),
            exit: Exit {
                mutex: &self.mutex,
                then: Some(&self.empty),
            },
            full: &self.full,
        })
    }

    /// Enters the consumer critical section.
    ///
    /// Blocks on `full` until the producer has published a state, then on
    /// `mutex`. Dropping the guard hands the slot back to the producer.
    ///
    /// Returns `None` once the producer has abandoned the handoff.
    #[must_use = "dropping the guard immediately hands the slot back"]
    pub fn begin_consume(&self) -> Option<ConsumeGuard<'_, T>> {
        self.full.acquire();
        self.mutex.acquire();

        if self.is_abandoned() {
            self.mutex.release();
            self.full.release();
            return None;
        }

        Some(ConsumeGuard {
            slot: self.slot.lock(),
            _exit: Exit {
                mutex: &self.mutex,
                then: Some(&self.empty),
            },
        })
    }

    /// Takes the `mutex` gate alone, leaving `empty`/`full` untouched.
    ///
    /// Used to (re)initialize the state without disturbing the handshake.
    #[must_use = "dropping the guard immediately releases the gate"]
    pub fn exclusive(&self) -> ExclusiveGuard<'_, T> {
        self.mutex.acquire();
        ExclusiveGuard {
            slot: self.slot.lock(),
            _exit: Exit {
                mutex: &self.mutex,
                then: None,
            },
        }
    }

    /// Releases `mutex` and `empty` once so a blocked producer wakes up.
    ///
    /// # Panics
    ///
    /// Panics if the handoff was already poisoned. The extra releases must
    /// happen exactly once or the gate counts drift.
    pub fn poison(&self) {
        let was_poisoned = self.poisoned.swap(true, Ordering::AcqRel);
        assert!(
            !was_poisoned,
            "Handoff poisoned twice! Shutdown releases must happen exactly once."
        );

        self.mutex.release();
        self.empty.release();
    }

    /// Marks the producer as gone and releases `full` once.
    ///
    /// A consumer blocked in [`Handoff::begin_consume`] wakes up and gets
    /// `None`. Only the first call releases.
    pub fn abandon(&self) {
        if !self.abandoned.swap(true, Ordering::AcqRel) {
            self.full.release();
        }
    }

    /// Returns whether [`Handoff::abandon`] has been called.
    #[inline]
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }

    /// Returns whether [`Handoff::poison`] has been called.
    #[inline]
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Returns the current gate counts (for tests and diagnostics).
    #[must_use]
    pub fn counts(&self) -> GateCounts {
        GateCounts {
            empty: self.empty.available_permits(),
            full: self.full.available_permits(),
            mutex: self.mutex.available_permits(),
        }
    }

    /// Consumes the handoff and returns the slot contents.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.slot.into_inner()
    }
}

/// Releases `mutex`, then an optional follow-up gate.
///
/// Declared after the slot lock in every guard, so the lock is gone first.
#[derive(Debug)]
struct Exit<'a> {
    mutex: &'a Semaphore,
    then: Option<&'a Semaphore>,
}

impl Drop for Exit<'_> {
    fn drop(&mut self) {
        self.mutex.release();
        if let Some(next) = self.then {
            next.release();
        }
    }
}

/// Producer access to the slot.
pub struct ProduceGuard<'a, T> {
    slot: MutexGuard<'a, T>,
    exit: Exit<'a>,
    full: &'a Semaphore,
}

impl<T> ProduceGuard<'_, T> {
    /// Publishes the write: releases `mutex`, then `full`.
    pub fn commit(mut self) {
        self.exit.then = Some(self.full);
    }
}

impl<T> Deref for ProduceGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.slot
    }
}

impl<T> DerefMut for ProduceGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.slot
    }
}

/// Consumer access to the slot.
pub struct ConsumeGuard<'a, T> {
    slot: MutexGuard<'a, T>,
    _exit: Exit<'a>,
}

impl<T> Deref for ConsumeGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.slot
    }
}

impl<T> DerefMut for ConsumeGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.slot
    }
}

/// Access to the slot under the `mutex` gate alone.
pub struct ExclusiveGuard<'a, T> {
    slot: MutexGuard<'a, T>,
    _exit: Exit<'a>,
}

impl<T> Deref for ExclusiveGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.slot
    }
}

impl<T> DerefMut for ExclusiveGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_single_exchange_restores_counts() {
        let handoff = Handoff::new(0_i32);
        assert_eq!(handoff.counts(), GateCounts::INITIAL);

        {
            let mut slot = handoff.begin_produce().unwrap();
            *slot = 42;
            slot.commit();
        }
        assert_eq!(
            handoff.counts(),
            GateCounts {
                empty: 0,
                full: 1,
                mutex: 1
            }
        );

        {
            let slot = handoff.begin_consume().unwrap();
            assert_eq!(*slot, 42);
        }
        assert_eq!(handoff.counts(), GateCounts::INITIAL);
    }

    #[test]
    fn test_uncommitted_produce_returns_vacancy() {
        let handoff = Handoff::new(0_i32);

        {
            let mut slot = handoff.begin_produce().unwrap();
            *slot = 7;
        }

        assert_eq!(handoff.counts(), GateCounts::INITIAL);
        assert_eq!(handoff.into_inner(), 7);
    }

    #[test]
    fn test_panicking_producer_releases_gates() {
        let handoff = Handoff::new(0_i32);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut slot = handoff.begin_produce().unwrap();
            *slot = 1;
            panic!("physics blew up");
        }));

        assert!(result.is_err());
        assert_eq!(handoff.counts(), GateCounts::INITIAL);
    }

    #[test]
    fn test_panicking_consumer_releases_gates() {
        let handoff = Handoff::new(0_i32);
        handoff.begin_produce().unwrap().commit();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _slot = handoff.begin_consume().unwrap();
            panic!("draw failed");
        }));

        assert!(result.is_err());
        assert_eq!(handoff.counts(), GateCounts::INITIAL);
    }

    #[test]
    fn test_exclusive_leaves_handshake_alone() {
        let handoff = Handoff::new(0_i32);
        {
            let mut slot = handoff.exclusive();
            *slot = 5;
            assert_eq!(handoff.counts().mutex, 0);
        }
        assert_eq!(handoff.counts(), GateCounts::INITIAL);
        assert_eq!(handoff.into_inner(), 5);
    }

    #[test]
    fn test_exclusive_blocks_producer() {
        let handoff = Arc::new(Handoff::new(0_i32));
        let entered = Arc::new(AtomicBool::new(false));

        let guard = handoff.exclusive();

        let producer = {
            let handoff = Arc::clone(&handoff);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let slot = handoff.begin_produce().unwrap();
                entered.store(true, Ordering::Release);
                slot.commit();
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!entered.load(Ordering::Acquire));

        drop(guard);
        producer.join().unwrap();
        assert!(entered.load(Ordering::Acquire));
    }

    #[test]
    fn test_mutual_exclusion_under_stress() {
        const ROUNDS: usize = 10_000;

        let handoff = Arc::new(Handoff::new(0_usize));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let enter = |inside: &AtomicUsize, max_inside: &AtomicUsize| {
            let now = inside.fetch_add(1, Ordering::AcqRel) + 1;
            max_inside.fetch_max(now, Ordering::AcqRel);
            thread::yield_now();
            inside.fetch_sub(1, Ordering::AcqRel);
        };

        let producer = {
            let handoff = Arc::clone(&handoff);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let mut slot = handoff.begin_produce().unwrap();
                    enter(&inside, &max_inside);
                    *slot += 1;
                    slot.commit();
                }
            })
        };

        for _ in 0..ROUNDS {
            let slot = handoff.begin_consume().unwrap();
            enter(&inside, &max_inside);
            drop(slot);
        }

        producer.join().unwrap();
        assert_eq!(max_inside.load(Ordering::Acquire), 1);
        assert_eq!(handoff.counts(), GateCounts::INITIAL);
        assert_eq!(Arc::try_unwrap(handoff).unwrap().into_inner(), ROUNDS);
    }

    #[test]
    fn test_consumer_always_sees_latest_state() {
        const ROUNDS: u64 = 2_000;

        let handoff = Arc::new(Handoff::new(0_u64));
        let written = Arc::new(AtomicU64::new(0));

        let producer = {
            let handoff = Arc::clone(&handoff);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                for value in 1..=ROUNDS {
                    let mut slot = handoff.begin_produce().unwrap();
                    *slot = value;
                    written.store(value, Ordering::Release);
                    slot.commit();
                }
            })
        };

        let mut last_seen = 0;
        for round in 0..ROUNDS {
            // Starve the producer now and then.
            if round % 100 == 0 {
                thread::sleep(Duration::from_millis(1));
            }
            let slot = handoff.begin_consume().unwrap();
            assert_eq!(*slot, written.load(Ordering::Acquire));
            assert_eq!(*slot, last_seen + 1);
            last_seen = *slot;
        }

        producer.join().unwrap();
        assert_eq!(last_seen, ROUNDS);
    }

    #[test]
    fn test_poison_wakes_producer_blocked_on_empty() {
        let handoff = Arc::new(Handoff::new(0_i32));
        handoff.begin_produce().unwrap().commit();

        let producer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.begin_produce().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        handoff.poison();

        assert!(producer.join().unwrap());
    }

    #[test]
    fn test_poison_wakes_producer_blocked_on_mutex() {
        let handoff = Arc::new(Handoff::new(0_i32));
        let held = handoff.exclusive();

        let producer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.begin_produce().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        handoff.poison();

        assert!(producer.join().unwrap());
        drop(held);
    }

    #[test]
    fn test_produce_after_poison_is_refused() {
        let handoff = Handoff::new(0_i32);
        handoff.poison();

        assert!(handoff.begin_produce().is_none());
        assert_eq!(handoff.into_inner(), 0);
    }

    #[test]
    fn test_abandon_wakes_blocked_consumer() {
        let handoff = Arc::new(Handoff::new(0_i32));

        let consumer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.begin_consume().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        handoff.abandon();
        handoff.abandon();

        assert!(consumer.join().unwrap());
        assert_eq!(handoff.counts().full, 1);
    }

    #[test]
    #[should_panic(expected = "Handoff poisoned twice")]
    fn test_double_poison_panics() {
        let handoff = Handoff::new(());
        handoff.poison();
        handoff.poison();
    }
}
