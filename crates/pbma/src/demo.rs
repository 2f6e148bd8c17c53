//! # Oscillator Demo
//!
//! A displacement that bounces between [`LOWER_BOUND`] and [`UPPER_BOUND`]
//! by a fixed [`STEP`] per simulation step, recording every value into a
//! [`Trace`]. The presentation side remembers what it last displayed.

use tracing::debug;

use crate::app::{Application, Simulation};
use crate::error::PbmaResult;
use crate::host::HostOptions;
use crate::trace::Trace;

/// Displacement at which the oscillator turns back down.
pub const UPPER_BOUND: f32 = 4.0;

/// Displacement at which the oscillator turns back up.
pub const LOWER_BOUND: f32 = 1.0;

/// Displacement change per simulation step.
pub const STEP: f32 = 0.01;

/// Shared world state of the oscillator.
#[derive(Clone, Debug, PartialEq)]
pub struct OscillatorWorld {
    displacement: f32,
    rising: bool,
    trace: Trace,
}

impl OscillatorWorld {
    /// Creates a world at rest at zero displacement, moving up.
    ///
    /// # Panics
    ///
    /// Panics if `trace_capacity` is zero.
    #[must_use]
    pub fn new(trace_capacity: usize) -> Self {
        Self {
            displacement: 0.0,
            rising: true,
            trace: Trace::new(trace_capacity),
        }
    }

    /// Current displacement.
    #[must_use]
    pub fn displacement(&self) -> f32 {
        self.displacement
    }

    /// Whether the displacement is currently increasing.
    #[must_use]
    pub fn is_rising(&self) -> bool {
        self.rising
    }

    /// Returns the world to rest, keeping the trace allocation.
    pub fn reset(&mut self) {
        self.displacement = 0.0;
        self.rising = true;
        self.trace.clear();
    }

    /// Recorded displacement history.
    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }
}

impl Simulation for OscillatorWorld {
    fn physics_update(&mut self, _delta_time: f32) {
        if self.rising && self.displacement > UPPER_BOUND {
            self.rising = false;
        } else if !self.rising && self.displacement < LOWER_BOUND {
            self.rising = true;
        }

        self.displacement += if self.rising { STEP } else { -STEP };
        self.trace.push(self.displacement);
    }
}

/// Presentation side of the oscillator.
#[derive(Debug)]
pub struct OscillatorApp {
    trace_capacity: usize,
    last_presented: Option<f32>,
    frames_drawn: u64,
    initializations: u64,
}

impl OscillatorApp {
    /// Creates the app; worlds it builds keep `trace_capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `trace_capacity` is zero.
    #[must_use]
    pub fn new(trace_capacity: usize) -> Self {
        assert!(trace_capacity > 0, "Trace capacity must be at least 1");
        Self {
            trace_capacity,
            last_presented: None,
            frames_drawn: 0,
            initializations: 0,
        }
    }

    /// Newest traced displacement shown in the most recent frame. `None`
    /// until a frame presents a stepped world.
    #[must_use]
    pub fn last_presented(&self) -> Option<f32> {
        self.last_presented
    }

    /// Number of frames that presented a world state.
    #[must_use]
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Number of times the world was (re)built.
    #[must_use]
    pub fn initializations(&self) -> u64 {
        self.initializations
    }
}

impl Application for OscillatorApp {
    type World = OscillatorWorld;

    fn set_options(&mut self, options: &mut HostOptions) {
        options.title = "Oscillator".to_string();
    }

    fn initialize(&mut self, world: &mut OscillatorWorld) -> PbmaResult<()> {
        if world.trace().capacity() == self.trace_capacity {
            world.reset();
        } else {
            *world = OscillatorWorld::new(self.trace_capacity);
        }
        self.last_presented = None;
        self.initializations += 1;
        Ok(())
    }

    fn pre_draw(&mut self, world: &mut OscillatorWorld) {
        self.last_presented = world.trace().latest();
        self.frames_drawn += 1;

        if self.frames_drawn % 600 == 0 {
            debug!(
                displacement = world.displacement(),
                samples = world.trace().len(),
                "oscillator frame"
            );
        }
    }
}
