use std::path::{Path, PathBuf};

use thiserror::Error;

/// Chatterbox simulation errors
///
/// Every variant surfaces either before the first worker is spawned or while
/// a finished run is torn down. The transition engine itself has no failure
/// path.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller count could not be determined
    #[error("Population error: {0}")]
    Population(String),

    /// Random range whose lower bound exceeds its upper bound
    #[error("Incorrect random range: {lower} > {upper}")]
    InvertedRange { lower: usize, upper: usize },

    /// Population too small for anybody to place a call
    #[error("At least {minimum} callers are required, got {count}")]
    TooFewCallers { count: usize, minimum: usize },

    /// A file could not be read or written
    #[error("Can't access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker task ended abnormally
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SimulationError {
    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Population error
    pub fn population<S: Into<String>>(msg: S) -> Self {
        Self::Population(msg.into())
    }

    /// Create a new FileAccess error
    pub fn file_access(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new Worker error
    pub fn worker<S: Into<String>>(msg: S) -> Self {
        Self::Worker(msg.into())
    }

    /// Create a new Internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error comes from user-supplied settings rather than the run itself
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Population(_)
                | Self::InvertedRange { .. }
                | Self::TooFewCallers { .. }
        )
    }
}

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, SimulationError>;
