//! Round lifecycle notifications for render, audio and UI collaborators.

use crate::casino::SettlementSummary;
use crate::trajectory::TrajectorySample;
use roulette_types::casino::{Account, BetKind, RoundPhase, RoundStats, SlotId};

/// Plain-integer view of the account for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountView {
    pub balance: u64,
    pub in_flight_stake: u64,
    pub last_settlement: i64,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            balance: account.balance,
            in_flight_stake: account.in_flight_stake,
            last_settlement: account.last_settlement,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableEvent {
    PhaseChanged {
        round_id: u64,
        phase: RoundPhase,
    },
    BetPlaced {
        slot: SlotId,
        kind: BetKind,
        amount: u64,
        slot_total: u64,
    },
    BetsReset {
        refunded: u64,
    },
    BalanceChanged(AccountView),
    BallMoved(TrajectorySample),
    RollingFinished {
        number: u8,
    },
    WagerResolved {
        slot: SlotId,
        kind: BetKind,
        won: bool,
        payout: u64,
    },
    Settled(SettlementSummary),
    StatsChanged(RoundStats),
    SpinTimedOut {
        elapsed_ms: u64,
    },
    PersistenceFailed {
        reason: String,
    },
    PersistenceRecovered,
}
