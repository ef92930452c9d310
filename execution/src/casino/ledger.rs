//! Open wagers for the current round.
//!
//! One wager per slot: placing again on a slot stacks another chip on the same wager. The ledger
//! only tracks stake; money moves through the account.

use super::roulette::{evaluate, SettlementError, SettlementSummary};
use roulette_types::casino::{BetLayout, SlotId, Wager};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger is frozen")]
    Frozen,
    #[error("slot {slot} holds a {existing:?} wager, not {requested:?}")]
    SlotLayoutMismatch {
        slot: SlotId,
        existing: BetLayout,
        requested: BetLayout,
    },
    #[error("stake on slot {slot} would overflow")]
    Overflow { slot: SlotId },
    #[error("slot {slot} restored twice")]
    DuplicateSlot { slot: SlotId },
}

#[derive(Clone, Debug, Default)]
pub struct BetLedger {
    wagers: BTreeMap<SlotId, Wager>,
    frozen: bool,
}

impl BetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `amount` could be stacked on `slot` with `layout`.
    pub fn check_place(
        &self,
        slot: &SlotId,
        layout: BetLayout,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if self.frozen {
            return Err(LedgerError::Frozen);
        }
        if let Some(existing) = self.wagers.get(slot) {
            if existing.layout != layout {
                return Err(LedgerError::SlotLayoutMismatch {
                    slot: slot.clone(),
                    existing: existing.layout,
                    requested: layout,
                });
            }
            existing
                .amount
                .checked_add(amount)
                .ok_or_else(|| LedgerError::Overflow { slot: slot.clone() })?;
        }
        Ok(())
    }

    /// Stack a chip of `amount` on `slot`, returning the wager as it now stands.
    pub fn place(
        &mut self,
        slot: SlotId,
        layout: BetLayout,
        amount: u64,
    ) -> Result<&Wager, LedgerError> {
        self.check_place(&slot, layout, amount)?;
        let overflow = LedgerError::Overflow { slot: slot.clone() };
        let wager = self
            .wagers
            .entry(slot.clone())
            .or_insert_with(|| Wager::new(slot, layout));
        if wager.push_chip(amount).is_none() {
            return Err(overflow);
        }
        Ok(wager)
    }

    /// Replace the open wagers with a restored set. Leaves the ledger open.
    pub fn restore(&mut self, wagers: Vec<Wager>) -> Result<(), LedgerError> {
        let mut restored = BTreeMap::new();
        for wager in wagers {
            let slot = wager.slot.clone();
            if restored.insert(slot.clone(), wager).is_some() {
                return Err(LedgerError::DuplicateSlot { slot });
            }
        }
        self.wagers = restored;
        self.frozen = false;
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Drop all wagers and reopen for placements.
    pub fn clear(&mut self) {
        self.wagers.clear();
        self.frozen = false;
    }

    pub fn get(&self, slot: &SlotId) -> Option<&Wager> {
        self.wagers.get(slot)
    }

    pub fn wagers(&self) -> impl Iterator<Item = &Wager> {
        self.wagers.values()
    }

    pub fn len(&self) -> usize {
        self.wagers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }

    /// Sum of all stakes, or `None` on overflow.
    pub fn total_stake(&self) -> Option<u64> {
        self.wagers
            .values()
            .try_fold(0u64, |acc, wager| acc.checked_add(wager.amount))
    }

    pub fn evaluate(&self, result: u8) -> Result<SettlementSummary, SettlementError> {
        evaluate(self.wagers.values(), result)
    }
}
