//! Simulation runs
//!
//! A run owns the switchboard and exactly three workers per caller. It is
//! put together with [`SimulationBuilder`], started with
//! [`SimulationBuilder::start`], and torn down through the returned
//! [`SimulationHandle`]:
//!
//! ```no_run
//! # use chatterbox_core::prelude::*;
//! # async fn demo() -> chatterbox_core::Result<()> {
//! let handle = SimulationBuilder::new()
//!     .callers(10)
//!     .seed(7)
//!     .sink(ConsoleSink::stdout())
//!     .start()?;
//!
//! tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//! handle.stop();
//! let report = handle.wait().await?;
//! println!("{} calls started", report.counters.calls_started);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::caller::{Caller, CallerId};
use crate::clock::{Clock, MonotonicClock};
use crate::config::{PacingConfig, SimulationConfig};
use crate::error::{Result, SimulationError};
use crate::event::TransitionCounters;
use crate::outcomes::{OutcomeSource, RandomOutcomes};
use crate::registry::{CallerRegistry, MIN_CALLERS, PairingViolation};
use crate::shutdown::ShutdownSignal;
use crate::sink::{ConsoleSink, EventSink};
use crate::switchboard::Switchboard;
use crate::worker::{Worker, WorkerExit, WorkerRole};

/// Builder for a simulation run
pub struct SimulationBuilder {
    config: SimulationConfig,
    callers: Option<usize>,
    seed: Option<u64>,
    outcomes: Option<Box<dyn OutcomeSource>>,
    sink: Option<Box<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    shutdown: Option<ShutdownSignal>,
    preamble: Vec<String>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
            callers: None,
            seed: None,
            outcomes: None,
            sink: None,
            clock: None,
            shutdown: None,
            preamble: Vec::new(),
        }
    }

    /// Use a full configuration
    pub fn config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace only the pacing section
    pub fn pacing(mut self, pacing: PacingConfig) -> Self {
        self.config.pacing = pacing;
        self
    }

    /// Number of callers
    pub fn callers(mut self, count: usize) -> Self {
        self.callers = Some(count);
        self
    }

    /// Seed the default random outcome source
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Supply the outcome source; takes precedence over [`seed`](Self::seed)
    pub fn outcomes(mut self, outcomes: impl OutcomeSource + 'static) -> Self {
        self.outcomes = Some(Box::new(outcomes));
        self
    }

    /// Where log lines go (stdout when unset)
    pub fn sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Timestamp source (measures from `start()` when unset)
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Share an existing stop flag, so triggers can be wired before start
    pub fn shutdown_signal(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Line written to the sink before any worker starts
    pub fn announce(mut self, line: impl Into<String>) -> Self {
        self.preamble.push(line.into());
        self
    }

    /// Check the builder without starting anything
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        match self.callers {
            None => Err(SimulationError::config("Caller count is required")),
            Some(count) if count < MIN_CALLERS => Err(SimulationError::TooFewCallers {
                count,
                minimum: MIN_CALLERS,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Build the switchboard and spawn every worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<SimulationHandle> {
        self.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SimulationError::internal(format!("No tokio runtime to run workers on: {}", e)))?;

        let count = self.callers.unwrap_or_default();
        let outcomes = match (self.outcomes, self.seed) {
            (Some(outcomes), _) => outcomes,
            (None, Some(seed)) => Box::new(RandomOutcomes::seeded(seed)) as Box<dyn OutcomeSource>,
            (None, None) => Box::new(RandomOutcomes::from_entropy()),
        };
        let sink = self.sink.unwrap_or_else(|| Box::new(ConsoleSink::stdout()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::starting_now()));
        let shutdown = self.shutdown.unwrap_or_default();
        let pacing = self.config.pacing;

        let switchboard = Arc::new(Switchboard::new(CallerRegistry::new(count), outcomes, sink, clock));
        for line in &self.preamble {
            switchboard.announce(line);
        }

        info!(
            "🚀 Starting simulation: {} callers, {} workers, tick {:?}, up to {} ticks per pause",
            count,
            count * WorkerRole::ALL.len(),
            pacing.tick(),
            pacing.max_pause_ticks
        );

        let mut workers = JoinSet::new();
        for index in 0..count {
            for role in WorkerRole::ALL {
                let worker = Worker::new(
                    role,
                    CallerId(index),
                    Arc::clone(&switchboard),
                    shutdown.clone(),
                    pacing.clone(),
                );
                workers.spawn_on(worker.run(), &runtime);
            }
        }
        debug!("✅ Spawned {} workers", workers.len());

        Ok(SimulationHandle {
            switchboard,
            shutdown,
            workers,
            pacing,
            started: Instant::now(),
        })
    }
}

/// A running simulation
pub struct SimulationHandle {
    switchboard: Arc<Switchboard>,
    shutdown: ShutdownSignal,
    workers: JoinSet<WorkerExit>,
    pacing: PacingConfig,
    started: Instant,
}

impl SimulationHandle {
    /// The run's stop flag
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Request a stop; returns `false` if one was already requested
    pub fn stop(&self) -> bool {
        self.shutdown.request_stop()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn population(&self) -> usize {
        self.switchboard.population()
    }

    /// Consistent copy of every caller, taken under the switchboard lock
    pub fn snapshot(&self) -> Vec<Caller> {
        self.switchboard.snapshot()
    }

    pub fn counters(&self) -> TransitionCounters {
        self.switchboard.counters()
    }

    /// Longest a worker may take to notice a stop request
    pub fn max_pause(&self) -> Duration {
        self.pacing.max_pause()
    }

    /// Wait for a stop request, let every worker exit, then flush the sink
    pub async fn wait(mut self) -> Result<SimulationReport> {
        self.shutdown.stopped().await;
        let stop_observed = Instant::now();

        let mut steps: HashMap<WorkerRole, u64> = HashMap::new();
        let mut failure = None;
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(exit) => *steps.entry(exit.role).or_default() += exit.steps,
                Err(e) => {
                    error!("❌ Worker task failed: {}", e);
                    failure.get_or_insert_with(|| SimulationError::worker(e.to_string()));
                }
            }
        }
        info!("✅ All workers exited {:?} after the stop request", stop_observed.elapsed());

        let flushed = self.switchboard.finish_sink();
        if let Some(failure) = failure {
            return Err(failure);
        }
        flushed?;

        let report = self.switchboard.with_exclusive(|state| {
            let registry = state.registry();
            SimulationReport {
                callers: registry.snapshot(),
                counters: state.counters(),
                worker_steps: WorkerSteps::from_map(&steps),
                elapsed: self.started.elapsed(),
                pairing_violation: registry.verify_pairing().err(),
            }
        });

        if let Some(violation) = &report.pairing_violation {
            warn!("⚠️ Registry ended in an inconsistent state: {}", violation);
        }
        info!(
            "📊 Run finished: {} calls started, {} ended, {} failed attempts",
            report.counters.calls_started, report.counters.calls_ended, report.counters.failed_attempts
        );
        Ok(report)
    }
}

/// Guarded steps taken per role, summed over all callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerSteps {
    pub initiator: u64,
    pub answerer: u64,
    pub terminator: u64,
}

impl WorkerSteps {
    fn from_map(steps: &HashMap<WorkerRole, u64>) -> Self {
        let of = |role| steps.get(&role).copied().unwrap_or_default();
        Self {
            initiator: of(WorkerRole::Initiator),
            answerer: of(WorkerRole::Answerer),
            terminator: of(WorkerRole::Terminator),
        }
    }

    pub fn total(&self) -> u64 {
        self.initiator + self.answerer + self.terminator
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Final state of every caller
    pub callers: Vec<Caller>,
    pub counters: TransitionCounters,
    pub worker_steps: WorkerSteps,
    /// Time from start to the end of teardown
    pub elapsed: Duration,
    /// First broken pairing in the final state, if any
    pub pairing_violation: Option<PairingViolation>,
}

impl SimulationReport {
    /// Whether the final registry passed the pairing check
    pub fn is_consistent(&self) -> bool {
        self.pairing_violation.is_none()
    }

    /// Callers per status: waiting, receiving, talking
    pub fn status_counts(&self) -> (usize, usize, usize) {
        CallerRegistry::from_callers(self.callers.clone()).status_counts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::outcomes::ScriptedOutcomes;
    use crate::sink::MemorySink;

    fn fast_pacing() -> PacingConfig {
        PacingConfig::new(Duration::from_millis(1), 3)
    }

    #[test]
    fn test_validate_requires_callers() {
        let err = SimulationBuilder::new().validate().unwrap_err();
        assert!(err.is_configuration());

        let err = SimulationBuilder::new().callers(1).validate().unwrap_err();
        assert!(matches!(err, SimulationError::TooFewCallers { count: 1, .. }));

        assert!(SimulationBuilder::new().callers(2).validate().is_ok());
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let result = SimulationBuilder::new()
            .callers(2)
            .sink(MemorySink::new())
            .start();
        assert!(matches!(result, Err(SimulationError::Internal(_))));
    }

    #[tokio::test]
    async fn test_spawns_three_workers_per_caller() {
        let handle = SimulationBuilder::new()
            .callers(4)
            .pacing(fast_pacing())
            .outcomes(ScriptedOutcomes::new())
            .sink(MemorySink::new())
            .clock(FixedClock(0.0))
            .start()
            .unwrap();

        assert_eq!(handle.worker_count(), 12);
        assert_eq!(handle.population(), 4);
        handle.stop();
        let report = handle.wait().await.unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.status_counts(), (4, 0, 0));
    }

    #[tokio::test]
    async fn test_preamble_precedes_transitions() {
        let sink = MemorySink::new();
        let handle = SimulationBuilder::new()
            .callers(2)
            .pacing(fast_pacing())
            .seed(3)
            .sink(sink.clone())
            .announce("Generated number: 2\n")
            .start()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop();
        handle.wait().await.unwrap();

        assert_eq!(sink.lines()[0], "Generated number: 2\n");
    }

    #[tokio::test]
    async fn test_external_signal_stops_the_run() {
        let shutdown = ShutdownSignal::new();
        let handle = SimulationBuilder::new()
            .callers(3)
            .pacing(fast_pacing())
            .seed(11)
            .sink(MemorySink::new())
            .shutdown_signal(shutdown.clone())
            .start()
            .unwrap();

        assert!(shutdown.request_stop());
        assert!(!handle.stop());
        let report = handle.wait().await.unwrap();
        assert!(report.is_consistent());
    }
}
