//! Per-caller workers
//!
//! Every caller gets three workers, one per role, all racing for the same
//! switchboard lock. A worker loops until shutdown: take the lock, try its
//! one transition, draw a pause, release the lock, pause.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::caller::CallerId;
use crate::config::PacingConfig;
use crate::shutdown::ShutdownSignal;
use crate::switchboard::{Switchboard, SwitchboardState};
use crate::transitions::{self, StepEffect};

/// The three per-caller roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerRole {
    /// Tries to place calls
    Initiator,
    /// Connects ringing pairs
    Answerer,
    /// Ends calls
    Terminator,
}

impl WorkerRole {
    pub const ALL: [WorkerRole; 3] = [
        WorkerRole::Initiator,
        WorkerRole::Answerer,
        WorkerRole::Terminator,
    ];

    /// Run this role's guarded step for `caller`
    pub fn step(self, state: &mut SwitchboardState, caller: CallerId) -> StepEffect {
        match self {
            WorkerRole::Initiator => transitions::initiate(state, caller),
            WorkerRole::Answerer => transitions::answer(state, caller),
            WorkerRole::Terminator => transitions::hang_up(state, caller),
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerRole::Initiator => "initiator",
            WorkerRole::Answerer => "answerer",
            WorkerRole::Terminator => "terminator",
        };
        f.write_str(name)
    }
}

/// What a worker did before it exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub role: WorkerRole,
    pub caller: CallerId,
    /// Guarded steps taken
    pub steps: u64,
    /// Steps that changed state or logged
    pub transitions: u64,
}

pub(crate) struct Worker {
    role: WorkerRole,
    caller: CallerId,
    switchboard: Arc<Switchboard>,
    shutdown: ShutdownSignal,
    pacing: PacingConfig,
}

impl Worker {
    pub(crate) fn new(
        role: WorkerRole,
        caller: CallerId,
        switchboard: Arc<Switchboard>,
        shutdown: ShutdownSignal,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            role,
            caller,
            switchboard,
            shutdown,
            pacing,
        }
    }

    pub(crate) async fn run(self) -> WorkerExit {
        let mut exit = WorkerExit {
            role: self.role,
            caller: self.caller,
            steps: 0,
            transitions: 0,
        };

        loop {
            // The flag is read under the lock so no step starts after a stop.
            let stepped = self.switchboard.with_exclusive(|state| {
                if self.shutdown.is_stop_requested() {
                    return None;
                }
                let effect = self.role.step(state, self.caller);
                Some((effect, state.draw_pause(self.pacing.max_pause_ticks)))
            });
            let Some((effect, pause_ticks)) = stepped else {
                break;
            };

            exit.steps += 1;
            if !effect.is_idle() {
                exit.transitions += 1;
            }
            self.pause(pause_ticks).await;
        }

        trace!("👋 {} {} exiting after {} steps", self.role, self.caller, exit.steps);
        exit
    }

    /// Sleep outside the lock; a stop request cuts the pause short
    async fn pause(&self, ticks: u32) {
        if ticks == 0 {
            tokio::task::yield_now().await;
            return;
        }
        let duration = self.pacing.tick().saturating_mul(ticks);
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown.stopped() => {}
        }
    }
}
