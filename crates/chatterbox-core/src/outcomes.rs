//! Random outcome model
//!
//! Every probabilistic decision a worker makes is a fresh draw from a small
//! discrete range. The source of those draws is injectable: production runs
//! use [`RandomOutcomes`], scenario tests script exact values with
//! [`ScriptedOutcomes`].

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sides of the "place a call?" die, drawn from `0..ATTEMPT_SIDES`
pub const ATTEMPT_SIDES: u32 = 5;

/// An attempt proceeds only when the roll is above this value (2 in 5)
pub const ATTEMPT_THRESHOLD: u32 = 2;

/// Sides of the "hang up?" die, drawn from `0..HANGUP_SIDES`
pub const HANGUP_SIDES: u32 = 20;

/// A call ends only when the roll is above this value (6 in 20)
pub const HANGUP_THRESHOLD: u32 = 13;

/// Source of the draws behind every worker decision.
///
/// Implementations are only ever called with the switchboard lock held, so
/// they need `Send` but never `Sync`.
pub trait OutcomeSource: Send {
    /// Uniform draw from `0..ATTEMPT_SIDES`
    fn attempt_roll(&mut self) -> u32;

    /// Uniform draw of a caller index from `0..population`
    fn pick_caller(&mut self, population: usize) -> usize;

    /// Uniform draw from `0..HANGUP_SIDES`
    fn hangup_roll(&mut self) -> u32;

    /// Uniform draw of a pause length from `0..max_ticks`
    fn pause_ticks(&mut self, max_ticks: u32) -> u32;
}

/// Uniform draws from any [`rand::Rng`]
#[derive(Debug, Clone)]
pub struct RandomOutcomes<R> {
    rng: R,
}

impl<R: Rng> RandomOutcomes<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomOutcomes<StdRng> {
    /// Reproducible outcomes for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Outcomes seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> OutcomeSource for RandomOutcomes<R> {
    fn attempt_roll(&mut self) -> u32 {
        self.rng.gen_range(0..ATTEMPT_SIDES)
    }

    fn pick_caller(&mut self, population: usize) -> usize {
        self.rng.gen_range(0..population)
    }

    fn hangup_roll(&mut self) -> u32 {
        self.rng.gen_range(0..HANGUP_SIDES)
    }

    fn pause_ticks(&mut self, max_ticks: u32) -> u32 {
        if max_ticks == 0 {
            0
        } else {
            self.rng.gen_range(0..max_ticks)
        }
    }
}

/// Replays queued draws in order.
///
/// When a queue runs dry the source falls back to values that make nothing
/// happen: attempt and hang-up rolls of 0, pauses of 0, and caller picks
/// that cycle through the population so target selection always finishes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOutcomes {
    attempts: VecDeque<u32>,
    targets: VecDeque<usize>,
    hangups: VecDeque<u32>,
    pauses: VecDeque<u32>,
    next_fallback_pick: usize,
}

impl ScriptedOutcomes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue attempt rolls (values above 2 place a call)
    pub fn with_attempts(mut self, rolls: impl IntoIterator<Item = u32>) -> Self {
        self.attempts.extend(rolls);
        self
    }

    /// Queue caller picks, consumed by target selection
    pub fn with_targets(mut self, picks: impl IntoIterator<Item = usize>) -> Self {
        self.targets.extend(picks);
        self
    }

    /// Queue hang-up rolls (values above 13 end a call)
    pub fn with_hangups(mut self, rolls: impl IntoIterator<Item = u32>) -> Self {
        self.hangups.extend(rolls);
        self
    }

    /// Queue pause lengths
    pub fn with_pauses(mut self, ticks: impl IntoIterator<Item = u32>) -> Self {
        self.pauses.extend(ticks);
        self
    }

    /// Draws still waiting to be consumed
    pub fn remaining(&self) -> usize {
        self.attempts.len() + self.targets.len() + self.hangups.len() + self.pauses.len()
    }
}

impl OutcomeSource for ScriptedOutcomes {
    fn attempt_roll(&mut self) -> u32 {
        self.attempts.pop_front().unwrap_or(0)
    }

    fn pick_caller(&mut self, population: usize) -> usize {
        match self.targets.pop_front() {
            Some(pick) => pick % population,
            None => {
                let pick = self.next_fallback_pick % population;
                self.next_fallback_pick = self.next_fallback_pick.wrapping_add(1);
                pick
            }
        }
    }

    fn hangup_roll(&mut self) -> u32 {
        self.hangups.pop_front().unwrap_or(0)
    }

    fn pause_ticks(&mut self, max_ticks: u32) -> u32 {
        let ticks = self.pauses.pop_front().unwrap_or(0);
        ticks.min(max_ticks.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_draws_stay_in_range() {
        let mut outcomes = RandomOutcomes::seeded(7);
        for _ in 0..2_000 {
            assert!(outcomes.attempt_roll() < ATTEMPT_SIDES);
            assert!(outcomes.hangup_roll() < HANGUP_SIDES);
            assert!(outcomes.pick_caller(3) < 3);
            assert!(outcomes.pause_ticks(10) < 10);
        }
        assert_eq!(outcomes.pause_ticks(0), 0);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = RandomOutcomes::seeded(42);
        let mut b = RandomOutcomes::seeded(42);
        let draws_a: Vec<u32> = (0..64).map(|_| a.attempt_roll() * 100 + a.hangup_roll()).collect();
        let draws_b: Vec<u32> = (0..64).map(|_| b.attempt_roll() * 100 + b.hangup_roll()).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_attempt_rate_is_two_in_five() {
        let mut outcomes = RandomOutcomes::seeded(1);
        let trials = 50_000;
        let hits = (0..trials)
            .filter(|_| outcomes.attempt_roll() > ATTEMPT_THRESHOLD)
            .count();
        let rate = hits as f64 / trials as f64;
        assert!((rate - 0.4).abs() < 0.02, "attempt rate was {}", rate);
    }

    #[test]
    fn test_hangup_rate_is_three_in_ten() {
        let mut outcomes = RandomOutcomes::seeded(2);
        let trials = 50_000;
        let hits = (0..trials)
            .filter(|_| outcomes.hangup_roll() > HANGUP_THRESHOLD)
            .count();
        let rate = hits as f64 / trials as f64;
        assert!((rate - 0.3).abs() < 0.02, "hang-up rate was {}", rate);
    }

    #[test]
    fn test_scripted_replays_then_falls_back() {
        let mut outcomes = ScriptedOutcomes::new()
            .with_attempts([4])
            .with_targets([1])
            .with_hangups([19])
            .with_pauses([25]);
        assert_eq!(outcomes.remaining(), 4);

        assert_eq!(outcomes.attempt_roll(), 4);
        assert_eq!(outcomes.pick_caller(3), 1);
        assert_eq!(outcomes.hangup_roll(), 19);
        assert_eq!(outcomes.pause_ticks(10), 9);
        assert_eq!(outcomes.remaining(), 0);

        assert_eq!(outcomes.attempt_roll(), 0);
        assert_eq!(outcomes.hangup_roll(), 0);
        assert_eq!(outcomes.pause_ticks(10), 0);
        let picks: Vec<usize> = (0..4).map(|_| outcomes.pick_caller(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0]);
    }
}
