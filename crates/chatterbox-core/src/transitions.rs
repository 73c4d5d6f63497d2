//! Guarded transition steps
//!
//! Each function here is one worker iteration's worth of check-then-act,
//! written against a [`SwitchboardState`] that the caller already holds
//! exclusively. Each step acts only on the status it is responsible for, so
//! when both ends of a pair race to do the same thing, whoever takes the lock
//! second simply finds nothing to do.
//!
//! Random draws are taken only after the status check passes.

use tracing::{trace, warn};

use crate::caller::{CallerId, CallerStatus};
use crate::event::TransitionEvent;
use crate::outcomes::{ATTEMPT_THRESHOLD, HANGUP_THRESHOLD};
use crate::registry::MIN_CALLERS;
use crate::switchboard::SwitchboardState;

/// What a single step did
#[derive(Debug, Clone, PartialEq)]
pub enum StepEffect {
    /// Preconditions or coin did not allow a transition
    Idle,

    /// Silent WAITING -> RECEIVING pairing with `target`
    Rang { target: CallerId },

    /// A logged transition
    Logged(TransitionEvent),
}

impl StepEffect {
    pub fn is_idle(&self) -> bool {
        matches!(self, StepEffect::Idle)
    }

    pub fn event(&self) -> Option<&TransitionEvent> {
        match self {
            StepEffect::Logged(event) => Some(event),
            _ => None,
        }
    }
}

/// Initiator step: maybe dial a random other caller.
///
/// Proceeds only if `caller` is WAITING and the attempt roll is above the
/// threshold. A waiting target starts ringing on both sides with no log
/// line; any other target produces a failed-attempt line and no change.
pub fn initiate(state: &mut SwitchboardState, caller: CallerId) -> StepEffect {
    if state.registry.status_of(caller) != CallerStatus::Waiting {
        return StepEffect::Idle;
    }
    if state.outcomes.attempt_roll() <= ATTEMPT_THRESHOLD {
        return StepEffect::Idle;
    }
    let Some(target) = pick_target(state, caller) else {
        return StepEffect::Idle;
    };

    if state.registry.status_of(target) == CallerStatus::Waiting {
        state.registry.connect(caller, target, CallerStatus::Receiving);
        state.counters.rings += 1;
        trace!("🔔 {} is ringing {}", caller, target);
        StepEffect::Rang { target }
    } else {
        let event = TransitionEvent::failed_attempt(caller, target, state.elapsed_secs());
        state.publish(&event);
        StepEffect::Logged(event)
    }
}

/// Answerer step: connect a ringing pair
pub fn answer(state: &mut SwitchboardState, caller: CallerId) -> StepEffect {
    let Some(partner) = live_partner(state, caller, CallerStatus::Receiving) else {
        return StepEffect::Idle;
    };

    state.registry.connect(caller, partner, CallerStatus::Talking);
    let event = TransitionEvent::call_started(caller, partner, state.elapsed_secs());
    state.publish(&event);
    StepEffect::Logged(event)
}

/// Terminator step: maybe end a call.
///
/// Both sides return to WAITING; their interlocutor fields keep naming the
/// former partner.
pub fn hang_up(state: &mut SwitchboardState, caller: CallerId) -> StepEffect {
    if state.registry.status_of(caller) != CallerStatus::Talking {
        return StepEffect::Idle;
    }
    if state.outcomes.hangup_roll() <= HANGUP_THRESHOLD {
        return StepEffect::Idle;
    }
    let Some(partner) = live_partner(state, caller, CallerStatus::Talking) else {
        return StepEffect::Idle;
    };

    state.registry.release(caller, partner);
    let event = TransitionEvent::call_ended(caller, partner, state.elapsed_secs());
    state.publish(&event);
    StepEffect::Logged(event)
}

/// Draw callers until one differs from `caller`
fn pick_target(state: &mut SwitchboardState, caller: CallerId) -> Option<CallerId> {
    let population = state.registry.len();
    if population < MIN_CALLERS {
        return None;
    }
    loop {
        let candidate = CallerId(state.outcomes.pick_caller(population));
        if candidate != caller {
            return Some(candidate);
        }
    }
}

/// Partner of `caller` if it currently has `status`
fn live_partner(state: &SwitchboardState, caller: CallerId, status: CallerStatus) -> Option<CallerId> {
    let record = state.caller(caller)?;
    if record.status != status {
        return None;
    }
    match record.interlocutor {
        Some(partner) => Some(partner),
        None => {
            warn!("⚠️ Caller {} is {} without a partner, skipping", caller, status);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::outcomes::ScriptedOutcomes;
    use crate::registry::CallerRegistry;
    use crate::sink::MemorySink;
    use crate::switchboard::Switchboard;
    use std::sync::Arc;

    fn board(count: usize, outcomes: ScriptedOutcomes, sink: &MemorySink) -> Switchboard {
        Switchboard::new(
            CallerRegistry::new(count),
            Box::new(outcomes),
            Box::new(sink.clone()),
            Arc::new(FixedClock(0.5)),
        )
    }

    #[test]
    fn test_low_attempt_roll_does_nothing() {
        let sink = MemorySink::new();
        let board = board(2, ScriptedOutcomes::new().with_attempts([0, 1, 2]).with_targets([1]), &sink);

        for _ in 0..3 {
            assert!(board.with_exclusive(|state| initiate(state, CallerId(0))).is_idle());
        }
        assert!(board.snapshot().iter().all(|c| c.is_waiting()));
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn test_target_selection_skips_self() {
        let sink = MemorySink::new();
        let board = board(3, ScriptedOutcomes::new().with_attempts([3]).with_targets([0, 0, 2]), &sink);

        let effect = board.with_exclusive(|state| initiate(state, CallerId(0)));
        assert_eq!(effect, StepEffect::Rang { target: CallerId(2) });
    }

    #[test]
    fn test_busy_initiator_does_not_roll() {
        let sink = MemorySink::new();
        let outcomes = ScriptedOutcomes::new().with_attempts([4, 4]).with_targets([1]);
        let board = board(3, outcomes, &sink);

        board.with_exclusive(|state| initiate(state, CallerId(0)));
        // caller 0 is now ringing; its initiator must not consume the second roll
        assert!(board.with_exclusive(|state| initiate(state, CallerId(0))).is_idle());
        board.with_exclusive(|state| assert_eq!(state.outcomes.attempt_roll(), 4));
    }

    #[test]
    fn test_second_answer_is_a_no_op() {
        let sink = MemorySink::new();
        let board = board(2, ScriptedOutcomes::new().with_attempts([4]).with_targets([1]), &sink);

        board.with_exclusive(|state| initiate(state, CallerId(0)));
        let first = board.with_exclusive(|state| answer(state, CallerId(1)));
        let second = board.with_exclusive(|state| answer(state, CallerId(0)));

        assert!(matches!(first, StepEffect::Logged(TransitionEvent::CallStarted { .. })));
        assert!(second.is_idle());
        assert_eq!(sink.lines(), vec!["(call started) - (0 and 1) at 0.500000\n".to_string()]);
    }

    #[test]
    fn test_low_hangup_roll_keeps_talking() {
        let sink = MemorySink::new();
        let outcomes = ScriptedOutcomes::new()
            .with_attempts([4])
            .with_targets([1])
            .with_hangups([13, 0]);
        let board = board(2, outcomes, &sink);

        board.with_exclusive(|state| initiate(state, CallerId(0)));
        board.with_exclusive(|state| answer(state, CallerId(0)));
        assert!(board.with_exclusive(|state| hang_up(state, CallerId(0))).is_idle());
        assert!(board.with_exclusive(|state| hang_up(state, CallerId(1))).is_idle());

        let snapshot = board.snapshot();
        assert!(snapshot.iter().all(|c| c.status == CallerStatus::Talking));
        assert_eq!(board.counters().calls_ended, 0);
    }

    #[test]
    fn test_waiting_caller_neither_answers_nor_hangs_up() {
        let sink = MemorySink::new();
        let board = board(2, ScriptedOutcomes::new().with_hangups([19]), &sink);

        assert!(board.with_exclusive(|state| answer(state, CallerId(0))).is_idle());
        assert!(board.with_exclusive(|state| hang_up(state, CallerId(0))).is_idle());
        // the hang-up die is only rolled for a talking caller
        board.with_exclusive(|state| assert_eq!(state.outcomes.hangup_roll(), 19));
    }
}
