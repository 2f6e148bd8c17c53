//! # PBMA
//!
//! Runs a simulation on a dedicated producer thread while a host-driven
//! presentation loop consumes its latest state, one frame at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Coordinator                           │
//! │                                                             │
//! │   Producer thread                 Host thread               │
//! │   ───────────────                 ───────────               │
//! │   Simulation::physics_update      Controls → commands       │
//! │          │                        Application::pre_draw     │
//! │          ▼                               ▲                  │
//! │   ┌────────────────────────────────────────────┐            │
//! │   │ Handoff<World>   empty(1) full(0) mutex(1) │            │
//! │   └────────────────────────────────────────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`app`]: the `Application` / `Simulation` capability traits
//! - [`coordinator`]: thread ownership, handshake and lifecycle
//! - [`controls`]: start/pause/restart commands from any thread
//! - [`host`]: the presentation environment and a headless host
//! - [`config`]: TOML configuration
//! - [`demo`]: the bouncing oscillator
//!
//! The synchronization kernel lives in [`pbma_core`].

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod app;
pub mod config;
pub mod controls;
pub mod coordinator;
pub mod demo;
pub mod error;
pub mod host;
pub mod stats;
pub mod trace;

pub use app::{Application, Simulation};
pub use config::{CoordinatorConfig, DemoConfig, HostConfig, PbmaConfig};
pub use controls::{Command, Controls};
pub use coordinator::Coordinator;
pub use error::{PbmaError, PbmaResult};
pub use host::{CloseHandle, FrameCallback, HeadlessHost, Host, HostOptions};
pub use pbma_core::{Clock, ManualClock, Phase, SystemClock};
pub use stats::{LoopStats, LoopStatsSnapshot};
pub use trace::Trace;
