use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Simulation configuration
///
/// Every section has defaults, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// [pacing]
/// tick_millis = 250
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Worker pacing
    pub pacing: PacingConfig,

    /// Diagnostic logging
    pub logging: LogSettings,
}

/// How long workers pause between steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Length of one time unit in milliseconds
    pub tick_millis: u64,

    /// Pauses are drawn uniformly from `0..max_pause_ticks`
    pub max_pause_ticks: u32,
}

/// Diagnostic logging settings as they appear in files and flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
    pub file_info: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            tick_millis: 1000,
            max_pause_ticks: 10,
        }
    }
}

impl PacingConfig {
    /// Pacing with a tick of `tick`.
    ///
    /// Ticks have millisecond granularity: a non-zero tick shorter than 1 ms
    /// becomes 1 ms, longer ticks drop their sub-millisecond part, and ticks
    /// beyond `u64::MAX` ms saturate.
    pub fn new(tick: Duration, max_pause_ticks: u32) -> Self {
        let mut tick_millis = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);
        if tick_millis == 0 && !tick.is_zero() {
            tick_millis = 1;
        }
        Self {
            tick_millis,
            max_pause_ticks,
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    /// Longest pause a worker can take, and so the bound on shutdown latency
    pub fn max_pause(&self) -> Duration {
        self.tick().saturating_mul(self.max_pause_ticks.saturating_sub(1))
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            file_info: false,
        }
    }
}

impl SimulationConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| SimulationError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SimulationError::file_access(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the workers cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pacing.tick_millis == 0 {
            return Err(SimulationError::config("pacing.tick_millis must be at least 1"));
        }
        if self.pacing.max_pause_ticks == 0 {
            return Err(SimulationError::config("pacing.max_pause_ticks must be at least 1"));
        }
        Ok(())
    }
}
