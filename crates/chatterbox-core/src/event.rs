//! Transition events and their log lines
//!
//! Log lines are consumed by downstream tooling, so their text is fixed:
//!
//! ```text
//! (failed call attempt) - (<caller> to <target>) at <elapsed_seconds>
//! (call started) - (<low_id> and <high_id>) at <elapsed_seconds>
//! (call ended) - (<low_id> and <high_id>) at <elapsed_seconds>
//! ```
//!
//! Every line ends with `\n`, and elapsed seconds carry six fractional digits.

use std::fmt;

use serde::Serialize;

use crate::caller::CallerId;

/// A logged state transition
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionEvent {
    /// An initiator dialled a caller that was not waiting
    FailedAttempt {
        caller: CallerId,
        target: CallerId,
        at: f64,
    },

    /// A ringing pair was connected
    CallStarted { low: CallerId, high: CallerId, at: f64 },

    /// A talking pair hung up
    CallEnded { low: CallerId, high: CallerId, at: f64 },
}

/// Kind of a [`TransitionEvent`], without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    FailedAttempt,
    CallStarted,
    CallEnded,
}

impl TransitionEvent {
    pub fn failed_attempt(caller: CallerId, target: CallerId, at: f64) -> Self {
        Self::FailedAttempt { caller, target, at }
    }

    /// Call started between `a` and `b`, ids stored low-to-high
    pub fn call_started(a: CallerId, b: CallerId, at: f64) -> Self {
        let (low, high) = ordered(a, b);
        Self::CallStarted { low, high, at }
    }

    /// Call ended between `a` and `b`, ids stored low-to-high
    pub fn call_ended(a: CallerId, b: CallerId, at: f64) -> Self {
        let (low, high) = ordered(a, b);
        Self::CallEnded { low, high, at }
    }

    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::FailedAttempt { .. } => TransitionKind::FailedAttempt,
            Self::CallStarted { .. } => TransitionKind::CallStarted,
            Self::CallEnded { .. } => TransitionKind::CallEnded,
        }
    }

    /// Elapsed seconds at which the transition happened
    pub fn at(&self) -> f64 {
        match self {
            Self::FailedAttempt { at, .. } | Self::CallStarted { at, .. } | Self::CallEnded { at, .. } => {
                *at
            }
        }
    }

    /// The log line, including its trailing newline
    pub fn log_line(&self) -> String {
        self.to_string()
    }
}

fn ordered(a: CallerId, b: CallerId) -> (CallerId, CallerId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedAttempt { caller, target, at } => {
                writeln!(f, "(failed call attempt) - ({} to {}) at {:.6}", caller, target, at)
            }
            Self::CallStarted { low, high, at } => {
                writeln!(f, "(call started) - ({} and {}) at {:.6}", low, high, at)
            }
            Self::CallEnded { low, high, at } => {
                writeln!(f, "(call ended) - ({} and {}) at {:.6}", low, high, at)
            }
        }
    }
}

/// Running totals of everything the switchboard has done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransitionCounters {
    /// Silent WAITING -> RECEIVING pairings
    pub rings: u64,
    pub failed_attempts: u64,
    pub calls_started: u64,
    pub calls_ended: u64,
}

impl TransitionCounters {
    pub fn record(&mut self, event: &TransitionEvent) {
        match event.kind() {
            TransitionKind::FailedAttempt => self.failed_attempts += 1,
            TransitionKind::CallStarted => self.calls_started += 1,
            TransitionKind::CallEnded => self.calls_ended += 1,
        }
    }

    /// Number of lines written to the sink
    pub fn logged(&self) -> u64 {
        self.failed_attempts + self.calls_started + self.calls_ended
    }
}
