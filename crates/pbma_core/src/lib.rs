//! # PBMA Core
//!
//! Synchronization kernel shared by the simulation producer thread and the
//! presentation consumer thread.
//!
//! ## Architecture Rules
//!
//! 1. **One meeting point** - the threads share state only through [`Handoff`]
//! 2. **Scoped gates** - every acquisition is released by a guard, on every path
//! 3. **Lock-free flags** - lifecycle flags are single-word atomics
//!
//! ## Example
//!
//! ```rust
//! use pbma_core::Handoff;
//!
//! let handoff = Handoff::new(0_u64);
//!
//! let mut slot = handoff.begin_produce().expect("not poisoned");
//! *slot = 42;
//! slot.commit();
//!
//! let slot = handoff.begin_consume().expect("producer alive");
//! assert_eq!(*slot, 42);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod lifecycle;
pub mod sync;

pub use clock::{Clock, ManualClock, SimulationClock, SystemClock};
pub use lifecycle::{LifecycleState, Phase};
pub use sync::{
    ConsumeGuard, ExclusiveGuard, GateCounts, Handoff, ProduceGuard, Semaphore, SemaphorePermit,
};
