//! # Synchronization Primitives for the Producer/Consumer Pair
//!
//! ## The Problem
//!
//! ```text
//! Thread 1 (Simulation):  WRITE the world state
//! Thread 2 (Presentation): READ the world state
//!
//! Without synchronization: TORN READS
//! With a bare flag:        LOST WAKEUPS → DEADLOCK
//! ```
//!
//! ## The Solution: A One-Slot Bounded Buffer
//!
//! ```text
//! empty (1) ─┐                      ┌─ full (0)
//!            ▼                      ▼
//!   Producer: acquire empty → acquire mutex → write → release mutex → release full
//!   Consumer: acquire full  → acquire mutex → read  → release mutex → release empty
//! ```
//!
//! The slot is overwritten in place. There is never a backlog.

mod handoff;
mod semaphore;

pub use handoff::{ConsumeGuard, ExclusiveGuard, GateCounts, Handoff, ProduceGuard};
pub use semaphore::{Semaphore, SemaphorePermit};
