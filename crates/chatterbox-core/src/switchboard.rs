//! The switchboard: one lock over the whole registry
//!
//! Transitions always touch two callers and must look atomic as a pair, so
//! the registry, the log sink, the outcome source and the counters all sit
//! behind a single exclusive lock. A worker's check-then-act step runs
//! entirely inside [`Switchboard::with_exclusive`]; the log line for a
//! transition is appended before the lock is released, which makes the log a
//! valid linearization of every transition.
//!
//! Critical sections are a handful of field reads and writes. Nothing in
//! here blocks or awaits while the lock is held, and there is never a second
//! lock to nest, so the switchboard cannot deadlock.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::caller::{Caller, CallerId};
use crate::clock::Clock;
use crate::error::Result;
use crate::event::{TransitionCounters, TransitionEvent};
use crate::outcomes::OutcomeSource;
use crate::registry::CallerRegistry;
use crate::sink::EventSink;

/// Everything guarded by the switchboard lock
pub struct SwitchboardState {
    pub(crate) registry: CallerRegistry,
    pub(crate) outcomes: Box<dyn OutcomeSource>,
    pub(crate) sink: Box<dyn EventSink>,
    pub(crate) counters: TransitionCounters,
    clock: Arc<dyn Clock>,
}

impl SwitchboardState {
    pub fn registry(&self) -> &CallerRegistry {
        &self.registry
    }

    pub fn counters(&self) -> TransitionCounters {
        self.counters
    }

    /// Elapsed seconds, read under the lock so timestamps follow lock order
    pub(crate) fn elapsed_secs(&self) -> f64 {
        self.clock.elapsed_secs()
    }

    /// Count a logged transition and append its line to the sink
    pub(crate) fn publish(&mut self, event: &TransitionEvent) {
        self.counters.record(event);
        debug!(?event, "📞 Transition");
        self.sink.record(&event.log_line());
    }

    /// Draw the pause that follows a step, in ticks
    pub(crate) fn draw_pause(&mut self, max_ticks: u32) -> u32 {
        self.outcomes.pause_ticks(max_ticks)
    }

    pub(crate) fn caller(&self, id: CallerId) -> Option<&Caller> {
        self.registry.get(id)
    }
}

/// Shared, lock-guarded simulation state
pub struct Switchboard {
    state: Mutex<SwitchboardState>,
}

impl Switchboard {
    pub fn new(
        registry: CallerRegistry,
        outcomes: Box<dyn OutcomeSource>,
        sink: Box<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Mutex::new(SwitchboardState {
                registry,
                outcomes,
                sink,
                counters: TransitionCounters::default(),
                clock,
            }),
        }
    }

    /// Run one check-and-mutate step with exclusive access to the whole registry
    pub fn with_exclusive<R>(&self, step: impl FnOnce(&mut SwitchboardState) -> R) -> R {
        let mut state = self.state.lock();
        step(&mut state)
    }

    /// Number of callers
    pub fn population(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Consistent copy of every caller
    pub fn snapshot(&self) -> Vec<Caller> {
        self.state.lock().registry.snapshot()
    }

    pub fn counters(&self) -> TransitionCounters {
        self.state.lock().counters
    }

    /// Write a line that is not a transition, such as a run preamble
    pub fn announce(&self, line: &str) {
        self.state.lock().sink.record(line);
    }

    /// Flush the sink; only meaningful once every worker has exited
    pub fn finish_sink(&self) -> Result<()> {
        self.state.lock().sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::CallerStatus;
    use crate::clock::FixedClock;
    use crate::outcomes::ScriptedOutcomes;
    use crate::sink::MemorySink;

    fn switchboard(count: usize, sink: MemorySink) -> Switchboard {
        Switchboard::new(
            CallerRegistry::new(count),
            Box::new(ScriptedOutcomes::new()),
            Box::new(sink),
            Arc::new(FixedClock(2.5)),
        )
    }

    #[test]
    fn test_publish_logs_and_counts_under_the_lock() {
        let sink = MemorySink::new();
        let board = switchboard(2, sink.clone());

        board.with_exclusive(|state| {
            let event = TransitionEvent::failed_attempt(CallerId(0), CallerId(1), state.elapsed_secs());
            state.publish(&event);
        });

        assert_eq!(sink.lines(), vec!["(failed call attempt) - (0 to 1) at 2.500000\n".to_string()]);
        assert_eq!(board.counters().failed_attempts, 1);
    }

    #[test]
    fn test_announce_goes_straight_to_the_sink() {
        let sink = MemorySink::new();
        let board = switchboard(3, sink.clone());
        board.announce("Generated number: 3\n");
        assert_eq!(sink.contents(), "Generated number: 3\n");
        assert_eq!(board.counters().logged(), 0);
    }

    #[test]
    fn test_snapshot_reflects_mutations() {
        let board = switchboard(2, MemorySink::new());
        board.with_exclusive(|state| {
            state.registry.connect(CallerId(0), CallerId(1), CallerStatus::Receiving)
        });

        let snapshot = board.snapshot();
        assert_eq!(board.population(), 2);
        assert_eq!(snapshot[0].status, CallerStatus::Receiving);
        assert_eq!(snapshot[1].interlocutor, Some(CallerId(0)));
    }
}
