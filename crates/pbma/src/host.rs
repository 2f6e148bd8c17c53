//! # Host Environment
//!
//! A host owns the presentation context and the blocking event loop. The
//! coordinator hands it a frame callback and waits for the loop to return.
//!
//! ```text
//!   Coordinator::run()
//!     ├─ host.setup(options)
//!     ├─ host.show(frame)   ← blocks; calls frame() once per tick
//!     └─ host.teardown()
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::config::HostConfig;
use crate::error::{PbmaError, PbmaResult};

/// Presentation options, adjustable by `Application::set_options`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostOptions {
    /// Window or session title.
    pub title: String,
    /// Pause between frames.
    pub frame_interval: Duration,
    /// Stop the event loop after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self::from(&HostConfig::default())
    }
}

impl From<&HostConfig> for HostOptions {
    fn from(config: &HostConfig) -> Self {
        Self {
            title: "pbma".to_string(),
            frame_interval: config.frame_interval(),
            frame_limit: config.frames,
        }
    }
}

/// The frame callback handed to [`Host::show`].
pub type FrameCallback<'a> = dyn FnMut() -> PbmaResult<()> + 'a;

/// A presentation environment with its own blocking event loop.
pub trait Host {
    /// Creates the presentation context.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot be created; `run()` aborts
    /// before any thread is spawned.
    fn setup(&mut self, options: &HostOptions) -> PbmaResult<()>;

    /// Runs the event loop until the user closes it.
    ///
    /// Must call `frame` exactly once per loop iteration, on the calling
    /// thread, and stop looping as soon as `frame` returns an error.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `frame` or by the loop itself.
    fn show(&mut self, frame: &mut FrameCallback<'_>) -> PbmaResult<()>;

    /// Destroys the presentation context. Called after the producer joined.
    fn teardown(&mut self) {}
}

/// Handle that asks a [`HeadlessHost`] to leave its loop.
#[derive(Clone, Debug, Default)]
pub struct CloseHandle {
    requested: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Requests the loop to end after the current frame.
    pub fn close(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Returns whether a close was requested.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// A host without a window: ticks frames at a fixed interval.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    options: Option<HostOptions>,
    close: CloseHandle,
    frames_run: u64,
}

impl HeadlessHost {
    /// Creates a headless host. Frame pacing comes from `setup`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle that ends the loop from any thread.
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    /// Returns the number of frames the loop has run.
    #[must_use]
    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }
}

impl Host for HeadlessHost {
    fn setup(&mut self, options: &HostOptions) -> PbmaResult<()> {
        debug!(title = %options.title, "headless host ready");
        self.options = Some(options.clone());
        Ok(())
    }

    fn show(&mut self, frame: &mut FrameCallback<'_>) -> PbmaResult<()> {
        let options = self
            .options
            .clone()
            .ok_or_else(|| PbmaError::Host("show() called before setup()".to_string()))?;

        while !self.close.is_closed() {
            if options.frame_limit.is_some_and(|limit| self.frames_run >= limit) {
                break;
            }

            frame()?;
            self.frames_run += 1;

            if !options.frame_interval.is_zero() {
                thread::sleep(options.frame_interval);
            }
        }

        Ok(())
    }

    fn teardown(&mut self) {
        debug!(frames = self.frames_run, "headless host closed");
        self.options = None;
    }
}
