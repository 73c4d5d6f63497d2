//! # Chatterbox Core
//!
//! A concurrent simulation of a population of phone callers. Each caller
//! cycles between waiting, ringing and talking, driven by three independent
//! workers that all race for one switchboard lock. Every transition that
//! matters is logged with the seconds elapsed since the run started.
//!
//! ## Features
//!
//! - **Single-lock switchboard**: every check-then-act step is atomic across
//!   the whole registry, so a pair of callers always changes together
//! - **Three workers per caller**: initiator, answerer and terminator
//! - **Cooperative shutdown**: one stop flag, observed within one pause
//! - **Injectable randomness and time**: seeded or scripted outcomes and a
//!   fixed clock make every scenario reproducible in tests
//! - **Pluggable log sinks**: console, buffered file, or in-memory
//!
//! ## Architecture
//!
//! - [`caller`]: caller ids, statuses and records
//! - [`registry`]: the caller registry and its pairing check
//! - [`switchboard`]: the lock around registry, sink, outcomes and counters
//! - [`transitions`]: the guarded initiate / answer / hang-up steps
//! - [`worker`]: the per-caller worker loops
//! - [`simulation`]: building, running and tearing down a run
//! - [`outcomes`], [`clock`], [`sink`]: the injectable collaborators
//! - [`population`]: fixed, ranged or file-based caller counts
//! - [`shutdown`]: the stop flag
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatterbox_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let handle = SimulationBuilder::new()
//!         .callers(5)
//!         .sink(ConsoleSink::stdout())
//!         .start()?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.stop();
//!
//!     let report = handle.wait().await?;
//!     assert!(report.is_consistent());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;
pub mod config;
pub mod logging;

// Simulation model
pub mod caller;
pub mod registry;
pub mod event;
pub mod switchboard;
pub mod transitions;
pub mod worker;
pub mod simulation;

// Collaborators
pub mod outcomes;
pub mod clock;
pub mod sink;
pub mod shutdown;
pub mod population;

// Re-exports for convenience
pub use error::{Result, SimulationError};
pub use config::SimulationConfig;
pub use simulation::{SimulationBuilder, SimulationHandle, SimulationReport};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Result, SimulationError};
    pub use crate::config::{LogSettings, PacingConfig, SimulationConfig};
    pub use crate::logging::{LoggingConfig, setup_logging};

    pub use crate::caller::{Caller, CallerId, CallerStatus};
    pub use crate::registry::{CallerRegistry, PairingViolation, MIN_CALLERS};
    pub use crate::event::{TransitionCounters, TransitionEvent, TransitionKind};
    pub use crate::switchboard::{Switchboard, SwitchboardState};
    pub use crate::transitions::StepEffect;
    pub use crate::worker::{WorkerExit, WorkerRole};
    pub use crate::simulation::{SimulationBuilder, SimulationHandle, SimulationReport, WorkerSteps};

    pub use crate::outcomes::{OutcomeSource, RandomOutcomes, ScriptedOutcomes};
    pub use crate::clock::{Clock, FixedClock, MonotonicClock};
    pub use crate::sink::{BufferedFileSink, ConsoleSink, EventSink, MemorySink};
    pub use crate::shutdown::ShutdownSignal;
    pub use crate::population::PopulationSource;
}
