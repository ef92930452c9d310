//! Common types used throughout the roulette table.
//!
//! Everything here is plain data: the round phase, wager shapes and their covered numbers,
//! the money account and the persisted snapshot. Nothing in this crate performs I/O.

pub mod casino;

pub use casino::{
    Account, AccountError, BetKind, BetLayout, ChipRecord, LayoutError, RoundPhase, RoundStats,
    SlotId, Snapshot, SnapshotError, Wager,
};
