//! # Lifecycle Controls
//!
//! User commands travel from UI callbacks (any thread) to the host thread
//! through a bounded crossbeam channel. The host thread applies them at the
//! start of each frame, before touching the handoff.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

/// A user-initiated lifecycle command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Enter the animating phase.
    StartAnimation,
    /// Enter the paused phase.
    PauseAnimation,
    /// Pause and rebuild the world through `Application::initialize`.
    Restart,
}

/// Cloneable handle for issuing commands. Never blocks.
#[derive(Clone, Debug)]
pub struct Controls {
    sender: Sender<Command>,
}

impl Controls {
    /// Enqueues a command (non-blocking).
    ///
    /// Returns `false` if the queue is full or the coordinator is gone; the
    /// command is dropped.
    pub fn send(&self, command: Command) -> bool {
        match self.sender.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                warn!(?command, "command queue full, dropping command");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Requests the animating phase.
    pub fn start_animation(&self) -> bool {
        self.send(Command::StartAnimation)
    }

    /// Requests the paused phase.
    pub fn pause_animation(&self) -> bool {
        self.send(Command::PauseAnimation)
    }

    /// Requests a restart.
    pub fn restart(&self) -> bool {
        self.send(Command::Restart)
    }
}

/// Both ends of the command channel, owned by the coordinator.
#[derive(Debug)]
pub(crate) struct CommandQueue {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
}

impl CommandQueue {
    /// Creates a queue holding at most `capacity` pending commands.
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a new control handle.
    pub(crate) fn controls(&self) -> Controls {
        Controls {
            sender: self.sender.clone(),
        }
    }

    /// Takes the next pending command, if any.
    pub(crate) fn next(&self) -> Option<Command> {
        self.receiver.try_recv().ok()
    }
}
