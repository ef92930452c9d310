//! Wager bookkeeping and payout rules.

pub mod ledger;
pub mod logging;
pub mod roulette;

pub use ledger::{BetLedger, LedgerError};
pub use roulette::{evaluate, resolve_wager, SettlementError, SettlementSummary, WagerOutcome};

#[cfg(test)]
mod integration_tests;
