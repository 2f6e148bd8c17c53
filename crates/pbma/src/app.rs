//! # Application Capabilities
//!
//! The two callback bodies a simulation plugs into the coordinator.
//!
//! ```text
//!   Host thread (Application)            Producer thread (Simulation)
//!   ─────────────────────────            ────────────────────────────
//!   set_options()   once
//!   initialize()    once, and on restart
//!   pre_draw()      once per frame  ◄──┐ ┌──► physics_update(dt)
//!                                      └─┴── World lives in the handoff slot
//! ```

use crate::error::PbmaResult;
use crate::host::HostOptions;

/// Producer-side payload: advances the world by one step.
///
/// Lives inside the handoff slot, so it must be [`Send`].
pub trait Simulation: Send + 'static {
    /// Advances the simulation by `delta_time` seconds.
    ///
    /// Called repeatedly on the producer thread while animating. Must not
    /// block.
    fn physics_update(&mut self, delta_time: f32);
}

/// Host-side collaborator: owns presentation state and reads the world.
pub trait Application {
    /// The shared simulation state.
    type World: Simulation;

    /// One-time configuration hook, invoked before the host is set up.
    fn set_options(&mut self, _options: &mut HostOptions) {}

    /// Builds (or rebuilds, on restart) the world and presentation state.
    ///
    /// Runs on the host thread while holding the `mutex` gate.
    ///
    /// # Errors
    ///
    /// An error aborts `run()` before the producer thread starts, or ends
    /// the host loop when raised by a restart.
    fn initialize(&mut self, world: &mut Self::World) -> PbmaResult<()>;

    /// Consumes the latest world state for presentation.
    ///
    /// Called once per animating frame while holding the `mutex` gate.
    fn pre_draw(&mut self, world: &mut Self::World);
}
