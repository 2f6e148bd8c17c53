//! # Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) is a valid configuration.
//!
//! ```toml
//! [coordinator]
//! max_delta_secs = 0.1
//! producer_thread_name = "pbma-producer"
//! command_capacity = 64
//! start_animating = false
//!
//! [host]
//! frames = 600
//! frame_interval_ms = 16
//!
//! [demo]
//! trace_capacity = 10000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{PbmaError, PbmaResult};

/// Top-level configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PbmaConfig {
    /// Producer/consumer coordination settings.
    pub coordinator: CoordinatorConfig,
    /// Host event loop settings.
    pub host: HostConfig,
    /// Demo application settings.
    pub demo: DemoConfig,
}

impl PbmaConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PbmaError::Config`] for malformed TOML and
    /// [`PbmaError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> PbmaResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PbmaError::ConfigIo`] if the file cannot be read, otherwise
    /// the same errors as [`PbmaConfig::from_toml_str`].
    pub fn load(path: &Path) -> PbmaResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PbmaError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`PbmaError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> PbmaResult<()> {
        self.coordinator.validate()?;
        if self.demo.trace_capacity == 0 {
            return Err(PbmaError::InvalidConfig(
                "demo.trace_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Producer/consumer coordination settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Upper bound on the delta handed to a simulation step, in seconds.
    /// `0.0` disables clamping.
    pub max_delta_secs: f32,
    /// Name of the producer thread.
    pub producer_thread_name: String,
    /// Capacity of the command queue between controls and the host thread.
    pub command_capacity: usize,
    /// Begin in the animating phase instead of paused.
    pub start_animating: bool,
}

impl CoordinatorConfig {
    /// Checks the coordinator section. `Coordinator::run` calls this before
    /// touching the host.
    ///
    /// # Errors
    ///
    /// Returns [`PbmaError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> PbmaResult<()> {
        if !self.max_delta_secs.is_finite() || self.max_delta_secs < 0.0 {
            return Err(PbmaError::InvalidConfig(format!(
                "coordinator.max_delta_secs must be a non-negative number, got {}",
                self.max_delta_secs
            )));
        }
        if self.command_capacity == 0 {
            return Err(PbmaError::InvalidConfig(
                "coordinator.command_capacity must be at least 1".to_string(),
            ));
        }
        if self.producer_thread_name.is_empty() || self.producer_thread_name.contains('\0') {
            return Err(PbmaError::InvalidConfig(
                "coordinator.producer_thread_name must be non-empty and free of NUL bytes"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the delta clamp, or `None` when clamping is disabled.
    #[must_use]
    pub fn delta_limit(&self) -> Option<f32> {
        (self.max_delta_secs > 0.0).then_some(self.max_delta_secs)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_delta_secs: 0.1,
            producer_thread_name: "pbma-producer".to_string(),
            command_capacity: 64,
            start_animating: false,
        }
    }
}

/// Host event loop settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Number of frames a headless host runs. `None` runs until closed.
    pub frames: Option<u64>,
    /// Pause between frames, in milliseconds.
    pub frame_interval_ms: u64,
}

impl HostConfig {
    /// Returns the frame interval as a [`Duration`].
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frames: None,
            frame_interval_ms: 16,
        }
    }
}

/// Demo application settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Number of samples the displacement trace keeps.
    pub trace_capacity: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            trace_capacity: 10_000,
        }
    }
}
