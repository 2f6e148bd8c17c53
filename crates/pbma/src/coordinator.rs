//! # Coordinator
//!
//! Owns the producer thread and drives the consumer step from the host loop.
//!
//! ```text
//! run():
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. SETUP                                                            │
//! │    ├─ app.set_options(options)                                      │
//! │    ├─ host.setup(options)                                           │
//! │    └─ app.initialize(world)          (host thread, under `mutex`)   │
//! │                                                                     │
//! │ 2. SPAWN PRODUCER                    while running:                 │
//! │                                        empty → mutex                │
//! │                                        physics_update(dt)           │
//! │                                          (only if animating)        │
//! │                                        mutex → full                 │
//! │                                                                     │
//! │ 3. HOST LOOP (blocking)              per frame:                     │
//! │                                        apply commands               │
//! │                                        if animating:                │
//! │                                          full → mutex               │
//! │                                          pre_draw()                 │
//! │                                          mutex → empty              │
//! │                                                                     │
//! │ 4. SHUTDOWN                                                         │
//! │    ├─ running = false, poison `mutex` + `empty` once                │
//! │    ├─ join producer                                                 │
//! │    └─ host.teardown()                                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The producer runs the handshake on every iteration and gates only the
//! payload on `is_animating()`. The consumer skips the handshake while
//! paused, so a paused host never blocks.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use pbma_core::{Clock, Handoff, LifecycleState, Phase, SimulationClock, SystemClock};
use tracing::{debug, error, info, warn};

use crate::app::{Application, Simulation};
use crate::config::CoordinatorConfig;
use crate::controls::{Command, CommandQueue, Controls};
use crate::error::{PbmaError, PbmaResult};
use crate::host::{Host, HostOptions};
use crate::stats::{LoopStats, LoopStatsSnapshot};

/// State shared by the producer thread and the host thread.
#[derive(Debug)]
struct Shared<W> {
    lifecycle: LifecycleState,
    handoff: Handoff<W>,
    stats: LoopStats,
    /// Set on every transition into animating. The producer rebases its
    /// clock before the next payload.
    resumed: AtomicBool,
}

impl<W> Shared<W> {
    /// Enters the animating phase, flagging a clock rebase on the edge.
    fn start_animation(&self) {
        if !self.lifecycle.is_animating() {
            self.resumed.store(true, Ordering::Release);
        }
        self.lifecycle.start_animation();
    }

    /// Stops the lifecycle and poisons the handoff, once.
    fn shutdown(&self) {
        if self.lifecycle.stop() {
            self.handoff.poison();
            info!("shutdown requested");
        }
    }
}

/// Stops the coordinator when dropped, so an unwinding host loop cannot
/// leave the producer blocked forever.
struct ShutdownGuard<W> {
    shared: Arc<Shared<W>>,
}

impl<W> Drop for ShutdownGuard<W> {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

/// Runs a simulation producer thread next to a host-driven consumer.
///
/// ## Usage
///
/// ```rust,no_run
/// use pbma::{Coordinator, HeadlessHost};
/// use pbma::demo::{OscillatorApp, OscillatorWorld};
///
/// let mut coordinator = Coordinator::new(OscillatorApp::new(1_000), OscillatorWorld::new(1_000));
/// let controls = coordinator.controls();
/// controls.start_animation();
///
/// let mut host = HeadlessHost::new();
/// coordinator.run(&mut host)?;
/// # Ok::<(), pbma::PbmaError>(())
/// ```
pub struct Coordinator<A: Application, C: Clock = SystemClock> {
    app: A,
    shared: Arc<Shared<A::World>>,
    commands: CommandQueue,
    config: CoordinatorConfig,
    host_options: HostOptions,
    clock: C,
}

impl<A: Application> Coordinator<A, SystemClock> {
    /// Creates a coordinator using the system clock.
    #[must_use]
    pub fn new(app: A, world: A::World) -> Self {
        Self::with_clock(app, world, SystemClock)
    }
}

impl<A: Application, C: Clock> Coordinator<A, C> {
    /// Creates a coordinator whose producer measures time with `clock`.
    #[must_use]
    pub fn with_clock(app: A, world: A::World, clock: C) -> Self {
        let config = CoordinatorConfig::default();
        Self {
            app,
            shared: Arc::new(Shared {
                lifecycle: LifecycleState::new(),
                handoff: Handoff::new(world),
                stats: LoopStats::new(),
                resumed: AtomicBool::new(false),
            }),
            commands: CommandQueue::new(config.command_capacity),
            config,
            host_options: HostOptions::default(),
            clock,
        }
    }

    /// Replaces the coordinator configuration.
    ///
    /// Control handles taken before this call are disconnected.
    #[must_use]
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.commands = CommandQueue::new(config.command_capacity.max(1));
        self.config = config;
        self
    }

    /// Replaces the options handed to `set_options` and the host.
    #[must_use]
    pub fn with_host_options(mut self, options: HostOptions) -> Self {
        self.host_options = options;
        self
    }

    /// Returns a handle for start/pause/restart commands.
    #[must_use]
    pub fn controls(&self) -> Controls {
        self.commands.controls()
    }

    /// Returns `false` once shutdown has begun.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.lifecycle.is_running()
    }

    /// Returns whether the simulation payload is active.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.shared.lifecycle.is_animating()
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.shared.lifecycle.phase()
    }

    /// Returns a copy of the loop counters.
    #[must_use]
    pub fn stats(&self) -> LoopStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Returns the application.
    #[must_use]
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Reads the world under the `mutex` gate.
    pub fn with_world<R>(&self, read: impl FnOnce(&A::World) -> R) -> R {
        let world = self.shared.handoff.exclusive();
        read(&world)
    }

    /// Runs the simulation until the host loop returns.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`PbmaError::InvalidConfig`] before touching the host,
    /// otherwise host setup/loop errors, initialization errors, a failed
    /// producer spawn, or [`PbmaError::ProducerPanicked`].
    pub fn run<H: Host>(&mut self, host: &mut H) -> PbmaResult<()> {
        assert!(
            self.shared.lifecycle.mark_started(),
            "Coordinator::run called twice! A coordinator runs exactly once."
        );
        if let Err(err) = self.config.validate() {
            self.shared.shutdown();
            return Err(err);
        }
        info!(phase = %self.phase(), "run starting");
        let _shutdown = ShutdownGuard {
            shared: Arc::clone(&self.shared),
        };

        let mut options = self.host_options.clone();
        self.app.set_options(&mut options);
        if let Err(err) = host.setup(&options) {
            self.shared.shutdown();
            return Err(err);
        }
        info!(title = %options.title, "host ready");

        let producer = match self.initialize().and_then(|()| self.spawn_producer()) {
            Ok(producer) => producer,
            Err(err) => {
                self.shared.shutdown();
                host.teardown();
                return Err(err);
            }
        };

        if self.config.start_animating {
            self.shared.start_animation();
        }

        let loop_result = host.show(&mut || self.consumer_step());

        self.shared.shutdown();
        let joined = producer.join();
        info!(clean = joined.is_ok(), "producer joined");
        host.teardown();

        let stats = self.stats();
        info!(
            steps = stats.steps,
            idle_steps = stats.idle_steps,
            frames = stats.frames(),
            restarts = stats.restarts,
            "simulation finished"
        );

        loop_result?;
        if joined.is_err() || self.shared.handoff.is_abandoned() {
            return Err(PbmaError::ProducerPanicked);
        }
        Ok(())
    }

    /// Builds the world on the host thread, before the producer exists.
    fn initialize(&mut self) -> PbmaResult<()> {
        let mut world = self.shared.handoff.exclusive();
        self.app.initialize(&mut world)
    }

    fn spawn_producer(&self) -> PbmaResult<JoinHandle<()>> {
        let shared = Arc::clone(&self.shared);
        let clock = self.clock.clone();
        let delta_limit = self.config.delta_limit();

        let handle = thread::Builder::new()
            .name(self.config.producer_thread_name.clone())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    producer_loop(&shared, clock, delta_limit);
                }));
                if let Err(payload) = outcome {
                    error!(reason = panic_message(&*payload), "producer thread panicked");
                    shared.handoff.abandon();
                    shared.lifecycle.stop();
                }
            })
            .map_err(PbmaError::ProducerSpawn)?;

        info!(thread = %self.config.producer_thread_name, "producer spawned");
        Ok(handle)
    }

    /// One host frame: apply pending commands, then consume if animating.
    fn consumer_step(&mut self) -> PbmaResult<()> {
        if !self.shared.lifecycle.is_running() {
            return if self.shared.handoff.is_abandoned() {
                Err(PbmaError::ProducerPanicked)
            } else {
                Ok(())
            };
        }

        while let Some(command) = self.commands.next() {
            self.apply(command)?;
        }

        if !self.shared.lifecycle.is_animating() {
            self.shared.stats.record_skipped();
            return Ok(());
        }

        let Some(mut world) = self.shared.handoff.begin_consume() else {
            return Err(PbmaError::ProducerPanicked);
        };
        self.app.pre_draw(&mut world);
        drop(world);

        self.shared.stats.record_presented();
        Ok(())
    }

    fn apply(&mut self, command: Command) -> PbmaResult<()> {
        debug!(?command, phase = %self.phase(), "applying command");
        match command {
            Command::StartAnimation => self.shared.start_animation(),
            Command::PauseAnimation => self.shared.lifecycle.pause_animation(),
            Command::Restart => {
                self.shared.lifecycle.pause_animation();
                self.initialize()?;
                self.shared.stats.record_restart();
                info!("simulation restarted");
            }
        }
        Ok(())
    }
}

/// Runs [`producer_step`] until the lifecycle stops or the handoff is
/// poisoned.
fn producer_loop<W: Simulation, C: Clock>(
    shared: &Shared<W>,
    clock: C,
    delta_limit: Option<f32>,
) {
    let mut clock = SimulationClock::new(clock);
    while shared.lifecycle.is_running() && producer_step(shared, &mut clock, delta_limit) {}
    debug!("producer loop exited");
}

/// One `empty → mutex → payload → mutex → full` iteration.
///
/// Returns `false` if the producer must exit. The payload only runs while
/// animating; the handshake always runs. The first payload after a pause
/// (or after startup) receives a zero delta.
fn producer_step<W: Simulation, C: Clock>(
    shared: &Shared<W>,
    clock: &mut SimulationClock<C>,
    delta_limit: Option<f32>,
) -> bool {
    let Some(mut world) = shared.handoff.begin_produce() else {
        return false;
    };
    if !shared.lifecycle.is_running() {
        return false;
    }

    if shared.lifecycle.is_animating() {
        if shared.resumed.swap(false, Ordering::AcqRel) {
            clock.reset();
        }
        let mut delta_time = clock.tick();
        if let Some(limit) = delta_limit.filter(|limit| delta_time > *limit) {
            warn!(delta_time, limit, "clamping simulation delta");
            delta_time = limit;
            shared.stats.record_clamped_delta();
        }
        world.physics_update(delta_time);
        shared.stats.record_step();
    } else {
        shared.stats.record_idle_step();
    }

    world.commit();
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FrameCallback;
    use std::time::Duration;

    /// World that counts payload invocations.
    #[derive(Debug, Default)]
    struct Counter {
        value: u64,
        deltas: Vec<f32>,
    }

    impl Simulation for Counter {
        fn physics_update(&mut self, delta_time: f32) {
            self.value += 1;
            self.deltas.push(delta_time);
        }
    }

    #[derive(Debug, Default)]
    struct Recorder {
        seen: Vec<u64>,
        initialized: u32,
        fail_initialize: bool,
    }

    impl Application for Recorder {
        type World = Counter;

        fn initialize(&mut self, world: &mut Counter) -> PbmaResult<()> {
            if self.fail_initialize {
                return Err(PbmaError::Initialize("no scene".to_string()));
            }
            *world = Counter::default();
            self.initialized += 1;
            Ok(())
        }

        fn pre_draw(&mut self, world: &mut Counter) {
            self.seen.push(world.value);
        }
    }

    /// Host that runs a fixed script of frames, sending commands in between.
    struct ScriptedHost {
        script: Vec<Option<Command>>,
        controls: Controls,
        torn_down: bool,
    }

    impl Host for ScriptedHost {
        fn setup(&mut self, _options: &HostOptions) -> PbmaResult<()> {
            Ok(())
        }

        fn show(&mut self, frame: &mut FrameCallback<'_>) -> PbmaResult<()> {
            for step in self.script.drain(..) {
                if let Some(command) = step {
                    self.controls.send(command);
                }
                frame()?;
            }
            Ok(())
        }

        fn teardown(&mut self) {
            self.torn_down = true;
        }
    }

    fn scripted(
        coordinator: &Coordinator<Recorder, impl Clock>,
        script: Vec<Option<Command>>,
    ) -> ScriptedHost {
        ScriptedHost {
            script,
            controls: coordinator.controls(),
            torn_down: false,
        }
    }

    #[test]
    fn test_paused_run_presents_nothing() {
        let mut coordinator = Coordinator::new(Recorder::default(), Counter::default());
        let mut host = scripted(&coordinator, vec![None; 5]);

        coordinator.run(&mut host).unwrap();

        assert!(host.torn_down);
        assert_eq!(coordinator.phase(), Phase::Stopped);
        assert!(coordinator.app().seen.is_empty());
        assert_eq!(coordinator.stats().frames_skipped, 5);
        assert_eq!(coordinator.with_world(|world| world.value), 0);
    }

    #[test]
    fn test_animating_frames_see_increasing_state() {
        let mut coordinator = Coordinator::new(Recorder::default(), Counter::default());
        let mut script = vec![Some(Command::StartAnimation)];
        script.extend(vec![None; 20]);
        let mut host = scripted(&coordinator, script);

        coordinator.run(&mut host).unwrap();

        let seen = &coordinator.app().seen;
        assert_eq!(seen.len(), 21);
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(*seen.last().unwrap() >= 1);
        assert_eq!(coordinator.stats().frames_presented, 21);
    }

    #[test]
    fn test_restart_reinitializes_and_pauses() {
        let mut coordinator = Coordinator::new(Recorder::default(), Counter::default());
        let mut script = vec![Some(Command::StartAnimation)];
        script.extend(vec![None; 10]);
        script.push(Some(Command::Restart));
        script.extend(vec![None; 3]);
        let mut host = scripted(&coordinator, script);

        coordinator.run(&mut host).unwrap();

        assert_eq!(coordinator.app().initialized, 2);
        assert_eq!(coordinator.app().seen.len(), 11);
        assert_eq!(coordinator.stats().restarts, 1);
        assert_eq!(coordinator.stats().frames_skipped, 4);
        assert_eq!(coordinator.with_world(|world| world.value), 0);
    }

    #[test]
    fn test_failed_initialize_aborts_before_producer() {
        let app = Recorder {
            fail_initialize: true,
            ..Recorder::default()
        };
        let mut coordinator = Coordinator::new(app, Counter::default());
        let mut host = scripted(&coordinator, vec![None; 3]);

        let result = coordinator.run(&mut host);

        assert!(matches!(result, Err(PbmaError::Initialize(_))));
        assert!(host.torn_down);
        assert_eq!(host.script.len(), 3);
        assert_eq!(coordinator.phase(), Phase::Stopped);
        assert_eq!(coordinator.stats().steps, 0);
    }

    #[test]
    fn test_invalid_config_rejected_before_setup() {
        let config = CoordinatorConfig {
            producer_thread_name: "bad\0name".to_string(),
            ..CoordinatorConfig::default()
        };
        let mut coordinator =
            Coordinator::new(Recorder::default(), Counter::default()).with_config(config);
        let mut host = scripted(&coordinator, vec![None; 3]);

        let result = coordinator.run(&mut host);

        assert!(matches!(result, Err(PbmaError::InvalidConfig(_))));
        assert!(!host.torn_down);
        assert_eq!(host.script.len(), 3);
        assert_eq!(coordinator.app().initialized, 0);
        assert_eq!(coordinator.phase(), Phase::Stopped);
    }

    #[test]
    #[should_panic(expected = "Coordinator::run called twice")]
    fn test_run_twice_panics() {
        let mut coordinator = Coordinator::new(Recorder::default(), Counter::default());
        let mut host = scripted(&coordinator, vec![None]);
        coordinator.run(&mut host).unwrap();
        let _ = coordinator.run(&mut host);
    }

    #[test]
    fn test_start_animating_from_config() {
        let config = CoordinatorConfig {
            start_animating: true,
            ..CoordinatorConfig::default()
        };
        let mut coordinator =
            Coordinator::new(Recorder::default(), Counter::default()).with_config(config);
        let mut host = scripted(&coordinator, vec![None; 4]);

        coordinator.run(&mut host).unwrap();

        assert_eq!(coordinator.app().seen.len(), 4);
    }

    /// Clock that jumps one second every time it is read.
    #[derive(Clone, Debug, Default)]
    struct JumpingClock(pbma_core::ManualClock);

    impl Clock for JumpingClock {
        fn now(&self) -> std::time::Instant {
            self.0.advance(Duration::from_secs(1));
            self.0.now()
        }
    }

    #[test]
    fn test_delta_is_clamped() {
        let config = CoordinatorConfig {
            max_delta_secs: 0.05,
            start_animating: true,
            ..CoordinatorConfig::default()
        };
        let mut coordinator = Coordinator::with_clock(
            Recorder::default(),
            Counter::default(),
            JumpingClock::default(),
        )
        .with_config(config);
        let mut host = scripted(&coordinator, vec![None; 3]);

        coordinator.run(&mut host).unwrap();

        let deltas = coordinator.with_world(|world| world.deltas.clone());
        assert!(!deltas.is_empty());
        assert!(deltas.iter().all(|delta| (*delta - 0.05).abs() < f32::EPSILON));
        assert_eq!(coordinator.stats().clamped_deltas, deltas.len() as u64);
    }

    #[test]
    fn test_zero_limit_disables_clamp() {
        let config = CoordinatorConfig {
            max_delta_secs: 0.0,
            start_animating: true,
            ..CoordinatorConfig::default()
        };
        let mut coordinator = Coordinator::with_clock(
            Recorder::default(),
            Counter::default(),
            JumpingClock::default(),
        )
        .with_config(config);
        let mut host = scripted(&coordinator, vec![None; 3]);

        coordinator.run(&mut host).unwrap();

        let deltas = coordinator.with_world(|world| world.deltas.clone());
        assert!(deltas.iter().all(|delta| *delta >= 1.0));
        assert_eq!(coordinator.stats().clamped_deltas, 0);
    }

    #[test]
    fn test_panicking_simulation_is_reported() {
        #[derive(Debug)]
        struct Exploding;

        impl Simulation for Exploding {
            fn physics_update(&mut self, _delta_time: f32) {
                panic!("integrator diverged");
            }
        }

        struct Viewer;

        impl Application for Viewer {
            type World = Exploding;

            fn initialize(&mut self, _world: &mut Exploding) -> PbmaResult<()> {
                Ok(())
            }

            fn pre_draw(&mut self, _world: &mut Exploding) {}
        }

        let config = CoordinatorConfig {
            start_animating: true,
            ..CoordinatorConfig::default()
        };
        let options = HostOptions {
            frame_interval: Duration::ZERO,
            frame_limit: Some(100),
            ..HostOptions::default()
        };
        let mut coordinator = Coordinator::new(Viewer, Exploding)
            .with_config(config)
            .with_host_options(options);
        let mut host = crate::host::HeadlessHost::new();

        let result = coordinator.run(&mut host);

        assert!(matches!(result, Err(PbmaError::ProducerPanicked)));
        assert_eq!(coordinator.phase(), Phase::Stopped);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
