//! Roulette wager resolution.
//!
//! Payouts exclude the original stake and follow one rule for every shape:
//! `stake * (36 - covered) / covered`.
//!
//! Resolution of a whole bet set produces the two totals the account settles against:
//! the winnings of winning wagers and the stake of losing wagers.

use super::logging::clamp_i64;
use roulette_types::casino::{BetKind, SlotId, Wager, MAX_NUMBER};
use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum SettlementError {
    #[error("winning number {number} out of range")]
    InvalidNumber { number: u8 },
    #[error("payout overflow on slot {slot}")]
    PayoutOverflow { slot: SlotId },
    #[error("settlement totals overflow")]
    TotalsOverflow,
}

/// How one wager fared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WagerOutcome {
    pub slot: SlotId,
    pub kind: BetKind,
    pub stake: u64,
    pub won: bool,
    /// Winnings excluding the returned stake; zero for a losing wager.
    pub payout: u64,
}

impl WagerOutcome {
    /// Profit or loss of this wager alone.
    pub fn pnl(&self) -> i64 {
        if self.won {
            clamp_i64(self.payout as i128)
        } else {
            clamp_i64(-(self.stake as i128))
        }
    }
}

/// Result of one settlement pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementSummary {
    pub number: u8,
    pub total_winnings: u64,
    pub total_lost: u64,
    /// Stake of winning wagers, handed back with the winnings.
    pub returned_stake: u64,
    /// Net applied to the account (`total_winnings - total_lost`).
    pub net: i64,
    pub outcomes: Vec<WagerOutcome>,
}

impl SettlementSummary {
    pub fn any_won(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.won)
    }
}

/// Check if a wager wins for a given result and what it pays.
pub fn resolve_wager(wager: &Wager, result: u8) -> Result<WagerOutcome, SettlementError> {
    if result > MAX_NUMBER {
        return Err(SettlementError::InvalidNumber { number: result });
    }
    let won = wager.is_winner(result);
    let payout = if won {
        wager.payout().ok_or_else(|| SettlementError::PayoutOverflow {
            slot: wager.slot.clone(),
        })?
    } else {
        0
    };
    Ok(WagerOutcome {
        slot: wager.slot.clone(),
        kind: wager.kind(),
        stake: wager.amount,
        won,
        payout,
    })
}

/// Resolve every open wager against `result`.
pub fn evaluate<'a, I>(wagers: I, result: u8) -> Result<SettlementSummary, SettlementError>
where
    I: IntoIterator<Item = &'a Wager>,
{
    let mut summary = SettlementSummary {
        number: result,
        total_winnings: 0,
        total_lost: 0,
        returned_stake: 0,
        net: 0,
        outcomes: Vec::new(),
    };
    for wager in wagers {
        let outcome = resolve_wager(wager, result)?;
        if outcome.won {
            summary.total_winnings = summary
                .total_winnings
                .checked_add(outcome.payout)
                .ok_or(SettlementError::TotalsOverflow)?;
            summary.returned_stake = summary
                .returned_stake
                .checked_add(outcome.stake)
                .ok_or(SettlementError::TotalsOverflow)?;
        } else {
            summary.total_lost = summary
                .total_lost
                .checked_add(outcome.stake)
                .ok_or(SettlementError::TotalsOverflow)?;
        }
        summary.outcomes.push(outcome);
    }
    summary.net = clamp_i64(summary.total_winnings as i128 - summary.total_lost as i128);
    Ok(summary)
}
