//! # Coordinator Error Types
//!
//! All errors that can surface from a coordinator run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running a simulation.
#[derive(Error, Debug)]
pub enum PbmaError {
    /// The host failed to set up its presentation context or its event loop.
    #[error("host failure: {0}")]
    Host(String),

    /// The application failed to initialize its scene or world state.
    #[error("initialization failed: {0}")]
    Initialize(String),

    /// The producer thread could not be spawned.
    #[error("failed to spawn producer thread: {0}")]
    ProducerSpawn(#[source] std::io::Error),

    /// The producer thread panicked inside a simulation step.
    #[error("producer thread panicked")]
    ProducerPanicked,

    /// Failed to read a configuration file.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this schema.
    #[error("invalid config syntax: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for coordinator operations.
pub type PbmaResult<T> = Result<T, PbmaError>;
