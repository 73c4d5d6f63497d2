//! Where the caller count comes from
//!
//! A run starts with a fixed count, a count drawn from a closed range, or a
//! count read from the first token of a text file. All validation happens
//! here, before any worker exists.

use std::fmt;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::debug;

use crate::error::{Result, SimulationError};
use crate::registry::MIN_CALLERS;

/// Source of the caller count
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulationSource {
    /// Explicit count
    Fixed(usize),

    /// Count drawn uniformly from `lower..=upper`
    Range { lower: usize, upper: usize },

    /// Count read from a file
    File(PathBuf),
}

impl PopulationSource {
    /// Check what can be checked without drawing or reading anything
    pub fn validate(&self) -> Result<()> {
        match self {
            PopulationSource::Fixed(count) => check_count(*count),
            PopulationSource::Range { lower, upper } => {
                if lower > upper {
                    return Err(SimulationError::InvertedRange {
                        lower: *lower,
                        upper: *upper,
                    });
                }
                check_count(*lower)
            }
            PopulationSource::File(_) => Ok(()),
        }
    }

    /// Produce the caller count
    pub fn resolve<R: Rng>(&self, rng: &mut R) -> Result<usize> {
        self.validate()?;
        let count = match self {
            PopulationSource::Fixed(count) => *count,
            PopulationSource::Range { lower, upper } => rng.gen_range(*lower..=*upper),
            PopulationSource::File(path) => read_count(path)?,
        };
        check_count(count)?;
        debug!("👥 Population resolved from {}: {} callers", self, count);
        Ok(count)
    }

    /// Line announcing a drawn count, written to the sink before the run.
    ///
    /// Only range-drawn counts are announced.
    pub fn announcement(&self, count: usize) -> Option<String> {
        match self {
            PopulationSource::Range { .. } => Some(format!("Generated number: {}\n", count)),
            _ => None,
        }
    }
}

impl fmt::Display for PopulationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationSource::Fixed(count) => write!(f, "fixed count {}", count),
            PopulationSource::Range { lower, upper } => write!(f, "range {}..={}", lower, upper),
            PopulationSource::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

fn check_count(count: usize) -> Result<()> {
    if count < MIN_CALLERS {
        return Err(SimulationError::TooFewCallers {
            count,
            minimum: MIN_CALLERS,
        });
    }
    Ok(())
}

fn read_count(path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path).map_err(|e| SimulationError::file_access(path, e))?;
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| SimulationError::population(format!("{} is empty", path.display())))?;
    token.parse::<usize>().map_err(|_| {
        SimulationError::population(format!(
            "{} does not start with a caller count: {:?}",
            path.display(),
            token
        ))
    })
}
