//! Phase rules for a roulette round, kept apart from the engine that applies them.
//!
//! Nothing here reads a clock. The caller reports how long the table has sat in
//! its current phase and whether the ball has stopped; the scheduler answers with
//! what should happen next.
//!
//! Rounds cycle `Betting -> Spinning -> Settlement -> Betting`:
//! - leaving Betting needs an explicit confirm, so the scheduler never proposes it;
//! - Spinning ends when the simulator reports the ball at rest, or with
//!   [`TransitionResult::SpinTimedOut`] once `max_spin_ms` passes;
//! - Settlement ends after `settlement_hold_ms`.
//!
//! ```rust,ignore
//! use roulette_execution::round_scheduler::{PhaseConfig, RoundScheduler, TransitionResult};
//! use roulette_types::RoundPhase;
//!
//! let rules = RoundScheduler::new(PhaseConfig::default());
//! assert_eq!(
//!     rules.check_transition(RoundPhase::Spinning, 5_000, false),
//!     TransitionResult::NoTransition
//! );
//! assert_eq!(
//!     rules.check_transition(RoundPhase::Spinning, 13_000, true),
//!     TransitionResult::TransitionTo(RoundPhase::Settlement)
//! );
//! ```

use roulette_types::RoundPhase;
use serde::{Deserialize, Serialize};

/// How long results stay up before betting reopens.
pub const DEFAULT_SETTLEMENT_HOLD_MS: u64 = 3_000;

/// Longest a spin may run before the engine stops waiting for the ball.
pub const DEFAULT_MAX_SPIN_MS: u64 = 60_000;

fn default_settlement_hold_ms() -> u64 {
    DEFAULT_SETTLEMENT_HOLD_MS
}

fn default_max_spin_ms() -> u64 {
    DEFAULT_MAX_SPIN_MS
}

/// Timing bounds for the phases that can end on their own, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseConfig {
    #[serde(default = "default_settlement_hold_ms")]
    pub settlement_hold_ms: u64,
    #[serde(default = "default_max_spin_ms")]
    pub max_spin_ms: u64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            settlement_hold_ms: DEFAULT_SETTLEMENT_HOLD_MS,
            max_spin_ms: DEFAULT_MAX_SPIN_MS,
        }
    }
}

impl PhaseConfig {
    pub fn new(settlement_hold_ms: u64, max_spin_ms: u64) -> Self {
        Self {
            settlement_hold_ms,
            max_spin_ms,
        }
    }

    /// Both bounds must be non-zero.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.settlement_hold_ms == 0 {
            return Err("settlement_hold_ms must be greater than zero");
        }
        if self.max_spin_ms == 0 {
            return Err("max_spin_ms must be greater than zero");
        }
        Ok(())
    }
}

/// Outcome of asking the scheduler whether the current phase is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionResult {
    /// Stay put.
    NoTransition,
    TransitionTo(RoundPhase),
    /// The ball never came to rest within `max_spin_ms`.
    SpinTimedOut,
}

#[derive(Clone, Debug)]
pub struct RoundScheduler {
    config: PhaseConfig,
}

impl RoundScheduler {
    pub fn new(config: PhaseConfig) -> Self {
        Self { config }
    }

    /// The phase that follows `phase`; Settlement wraps back to Betting.
    pub fn next_phase(phase: RoundPhase) -> RoundPhase {
        match phase {
            RoundPhase::Betting => RoundPhase::Spinning,
            RoundPhase::Spinning => RoundPhase::Settlement,
            RoundPhase::Settlement => RoundPhase::Betting,
        }
    }

    /// Decide whether the table should leave `phase`.
    ///
    /// A finished roll beats the timeout when both hold on the same tick.
    pub fn check_transition(
        &self,
        phase: RoundPhase,
        elapsed_ms: u64,
        roll_finished: bool,
    ) -> TransitionResult {
        let due = match phase {
            RoundPhase::Betting => false,
            RoundPhase::Spinning if roll_finished => true,
            RoundPhase::Spinning if elapsed_ms >= self.config.max_spin_ms => {
                return TransitionResult::SpinTimedOut
            }
            RoundPhase::Spinning => false,
            RoundPhase::Settlement => elapsed_ms >= self.config.settlement_hold_ms,
        };
        if due {
            TransitionResult::TransitionTo(Self::next_phase(phase))
        } else {
            TransitionResult::NoTransition
        }
    }

    pub fn is_betting_open(&self, phase: RoundPhase) -> bool {
        phase == RoundPhase::Betting
    }

    /// Wagers resolve only while the ball is (or was just) in motion.
    pub fn can_settle(&self, phase: RoundPhase) -> bool {
        phase == RoundPhase::Spinning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RoundScheduler {
        RoundScheduler::new(PhaseConfig::new(3_000, 20_000))
    }

    #[test]
    fn test_zero_bounds_are_rejected() {
        assert!(PhaseConfig::default().validate().is_ok());
        assert_eq!(
            PhaseConfig::new(0, 20_000).validate(),
            Err("settlement_hold_ms must be greater than zero")
        );
        assert_eq!(
            PhaseConfig::new(3_000, 0).validate(),
            Err("max_spin_ms must be greater than zero")
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: PhaseConfig = serde_json::from_str(r#"{"max_spin_ms":500}"#).unwrap();
        assert_eq!(config, PhaseConfig::new(DEFAULT_SETTLEMENT_HOLD_MS, 500));
    }

    #[test]
    fn test_phases_wrap_around() {
        let mut phase = RoundPhase::Settlement;
        let mut seen = Vec::new();
        for _ in 0..3 {
            phase = RoundScheduler::next_phase(phase);
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![RoundPhase::Betting, RoundPhase::Spinning, RoundPhase::Settlement]
        );
    }

    #[test]
    fn test_betting_waits_for_confirm() {
        assert_eq!(
            rules().check_transition(RoundPhase::Betting, u64::MAX, true),
            TransitionResult::NoTransition
        );
    }

    #[test]
    fn test_spin_ends_when_ball_rests() {
        let rules = rules();
        assert_eq!(
            rules.check_transition(RoundPhase::Spinning, 5_000, false),
            TransitionResult::NoTransition
        );
        assert_eq!(
            rules.check_transition(RoundPhase::Spinning, 5_000, true),
            TransitionResult::TransitionTo(RoundPhase::Settlement)
        );
        assert_eq!(
            rules.check_transition(RoundPhase::Spinning, 25_000, true),
            TransitionResult::TransitionTo(RoundPhase::Settlement)
        );
    }

    #[test]
    fn test_spin_times_out_at_bound() {
        let rules = rules();
        assert_eq!(
            rules.check_transition(RoundPhase::Spinning, 19_999, false),
            TransitionResult::NoTransition
        );
        assert_eq!(
            rules.check_transition(RoundPhase::Spinning, 20_000, false),
            TransitionResult::SpinTimedOut
        );
    }

    #[test]
    fn test_results_held_before_next_round() {
        let rules = rules();
        assert_eq!(
            rules.check_transition(RoundPhase::Settlement, 2_999, true),
            TransitionResult::NoTransition
        );
        assert_eq!(
            rules.check_transition(RoundPhase::Settlement, 3_000, false),
            TransitionResult::TransitionTo(RoundPhase::Betting)
        );
    }

    #[test]
    fn test_action_gates_by_phase() {
        let rules = rules();
        let phases = [
            RoundPhase::Betting,
            RoundPhase::Spinning,
            RoundPhase::Settlement,
        ];
        let open: Vec<bool> = phases.iter().map(|p| rules.is_betting_open(*p)).collect();
        let settle: Vec<bool> = phases.iter().map(|p| rules.can_settle(*p)).collect();
        assert_eq!(open, vec![true, false, false]);
        assert_eq!(settle, vec![false, true, false]);
    }

    #[test]
    fn test_sixty_hz_round() {
        let rules = rules();
        let mut phase = RoundScheduler::next_phase(RoundPhase::Betting);
        let mut ticks = 0u64;
        let mut elapsed = 0;
        loop {
            let rested = phase == RoundPhase::Spinning && elapsed >= 13_000;
            match rules.check_transition(phase, elapsed, rested) {
                TransitionResult::NoTransition => elapsed += 16,
                TransitionResult::TransitionTo(RoundPhase::Betting) => break,
                TransitionResult::TransitionTo(next) => {
                    phase = next;
                    elapsed = 0;
                }
                TransitionResult::SpinTimedOut => panic!("ball rested before the bound"),
            }
            ticks += 1;
        }
        // 13.008s of spin plus 3.008s of hold, in 16ms steps
        assert_eq!(ticks, 813 + 1 + 188);
    }
}
