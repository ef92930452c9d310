use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

use super::{Account, LayoutError, RoundStats, SlotId, Wager, SNAPSHOT_VERSION};

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("wager on slot {slot} has an invalid layout: {source}")]
    InvalidLayout { slot: SlotId, source: LayoutError },
    #[error("slot {slot} appears more than once")]
    DuplicateSlot { slot: SlotId },
    #[error("wager on slot {slot} has no stake")]
    EmptyWager { slot: SlotId },
    #[error("wager on slot {slot} stakes {amount} but its chips total {chips}")]
    ChipMismatch { slot: SlotId, amount: u64, chips: u64 },
    #[error("wagers total {wagers} but in-flight stake is {in_flight}")]
    StakeMismatch { wagers: u64, in_flight: u64 },
    #[error("snapshot totals overflow")]
    Overflow,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Everything that survives a restart.
///
/// All fields default, so a record written with fewer fields (or none at all) still loads.
/// `Snapshot::default()` is the first-run state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub account: Account,
    #[serde(default)]
    pub stats: RoundStats,
    #[serde(default)]
    pub wagers: Vec<Wager>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            account: Account::default(),
            stats: RoundStats::default(),
            wagers: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Sum of all wager amounts, or `None` on overflow.
    pub fn wagers_total(&self) -> Option<u64> {
        self.wagers
            .iter()
            .try_fold(0u64, |acc, wager| acc.checked_add(wager.amount))
    }

    /// Check that the open wagers can be restored as-is.
    ///
    /// Chips are optional (older records did not carry them) but, when present, must add up to
    /// the wager amount.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
            });
        }

        let mut seen = BTreeSet::new();
        for wager in &self.wagers {
            if !seen.insert(&wager.slot) {
                return Err(SnapshotError::DuplicateSlot {
                    slot: wager.slot.clone(),
                });
            }
            wager
                .layout
                .validate()
                .map_err(|source| SnapshotError::InvalidLayout {
                    slot: wager.slot.clone(),
                    source,
                })?;
            if wager.amount == 0 {
                return Err(SnapshotError::EmptyWager {
                    slot: wager.slot.clone(),
                });
            }
            if !wager.chips.is_empty() {
                let chips = wager.chips_total().ok_or(SnapshotError::Overflow)?;
                if chips != wager.amount {
                    return Err(SnapshotError::ChipMismatch {
                        slot: wager.slot.clone(),
                        amount: wager.amount,
                        chips,
                    });
                }
            }
        }

        let wagers = self.wagers_total().ok_or(SnapshotError::Overflow)?;
        if wagers != self.account.in_flight_stake {
            return Err(SnapshotError::StakeMismatch {
                wagers,
                in_flight: self.account.in_flight_stake,
            });
        }
        Ok(())
    }
}
