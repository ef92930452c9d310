use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

use super::{is_red, CHIP_STACK_OFFSET, MAX_NUMBER, PAYOUT_BASE};

/// Roulette bet kinds.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetKind {
    Straight = 0, // Single number (35:1)
    Split = 1,    // Two adjacent numbers (17:1)
    Street = 2,   // One row of three (11:1)
    Corner = 3,   // Block of four (8:1)
    SixLine = 4,  // Two adjacent rows (5:1)
    Column = 5,   // First, second, third column (2:1)
    Dozen = 6,    // 1-12, 13-24, 25-36 (2:1)
    RedBlack = 7, // Red or black (1:1)
    EvenOdd = 8,  // Even or odd (1:1)
    HighLow = 9,  // 1-18 or 19-36 (1:1)
}

impl BetKind {
    pub const ALL: [BetKind; 10] = [
        BetKind::Straight,
        BetKind::Split,
        BetKind::Street,
        BetKind::Corner,
        BetKind::SixLine,
        BetKind::Column,
        BetKind::Dozen,
        BetKind::RedBlack,
        BetKind::EvenOdd,
        BetKind::HighLow,
    ];

    /// Number of wheel numbers a wager of this kind pays out on.
    pub fn covered_numbers_count(&self) -> u8 {
        match self {
            BetKind::Straight => 1,
            BetKind::Split => 2,
            BetKind::Street => 3,
            BetKind::Corner => 4,
            BetKind::SixLine => 6,
            BetKind::Column | BetKind::Dozen => 12,
            BetKind::RedBlack | BetKind::EvenOdd | BetKind::HighLow => 18,
        }
    }

    /// Payout multiplier (excludes original stake): `(36 - covered) / covered`.
    ///
    /// Every covered count divides 36, so the integer division is exact.
    pub fn payout_multiplier(&self) -> u64 {
        let covered = self.covered_numbers_count() as u64;
        (PAYOUT_BASE - covered) / covered
    }

    /// Winnings for a winning stake, or `None` on overflow.
    pub fn payout(&self, stake: u64) -> Option<u64> {
        stake.checked_mul(self.payout_multiplier())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BetKind::Straight => "straight",
            BetKind::Split => "split",
            BetKind::Street => "street",
            BetKind::Corner => "corner",
            BetKind::SixLine => "six_line",
            BetKind::Column => "column",
            BetKind::Dozen => "dozen",
            BetKind::RedBlack => "red_black",
            BetKind::EvenOdd => "even_odd",
            BetKind::HighLow => "high_low",
        }
    }
}

impl TryFrom<u8> for BetKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        BetKind::ALL.get(value as usize).copied().ok_or(())
    }
}

impl fmt::Display for BetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum LayoutError {
    #[error("number out of range (got={number}, max=36)")]
    NumberOutOfRange { number: u8 },
    #[error("split numbers are not adjacent ({first}, {second})")]
    NotAdjacent { first: u8, second: u8 },
    #[error("invalid {kind} start number {start}")]
    InvalidStart { kind: BetKind, start: u8 },
    #[error("invalid {kind} index {index} (expected 0, 1 or 2)")]
    InvalidIndex { kind: BetKind, index: u8 },
}

/// Shape of a wager on the table layout.
///
/// Row-based shapes follow the three-column felt: row `r` holds `3r+1, 3r+2, 3r+3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BetLayout {
    Straight { number: u8 },
    Split { first: u8, second: u8 },
    Street { start: u8 },
    Corner { start: u8 },
    SixLine { start: u8 },
    Column { index: u8 },
    Dozen { index: u8 },
    RedBlack { red: bool },
    EvenOdd { even: bool },
    HighLow { high: bool },
}

impl BetLayout {
    pub fn kind(&self) -> BetKind {
        match self {
            BetLayout::Straight { .. } => BetKind::Straight,
            BetLayout::Split { .. } => BetKind::Split,
            BetLayout::Street { .. } => BetKind::Street,
            BetLayout::Corner { .. } => BetKind::Corner,
            BetLayout::SixLine { .. } => BetKind::SixLine,
            BetLayout::Column { .. } => BetKind::Column,
            BetLayout::Dozen { .. } => BetKind::Dozen,
            BetLayout::RedBlack { .. } => BetKind::RedBlack,
            BetLayout::EvenOdd { .. } => BetKind::EvenOdd,
            BetLayout::HighLow { .. } => BetKind::HighLow,
        }
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let kind = self.kind();
        match *self {
            BetLayout::Straight { number } => {
                if number > MAX_NUMBER {
                    return Err(LayoutError::NumberOutOfRange { number });
                }
            }
            BetLayout::Split { first, second } => {
                for number in [first, second] {
                    if number == 0 || number > MAX_NUMBER {
                        return Err(LayoutError::NumberOutOfRange { number });
                    }
                }
                let (low, high) = (first.min(second), first.max(second));
                let vertical = high - low == 3;
                let horizontal = high - low == 1 && low % 3 != 0;
                if !vertical && !horizontal {
                    return Err(LayoutError::NotAdjacent { first, second });
                }
            }
            BetLayout::Street { start } => {
                if start == 0 || start > 34 || start % 3 != 1 {
                    return Err(LayoutError::InvalidStart { kind, start });
                }
            }
            BetLayout::Corner { start } => {
                if start == 0 || start > 32 || start % 3 == 0 {
                    return Err(LayoutError::InvalidStart { kind, start });
                }
            }
            BetLayout::SixLine { start } => {
                if start == 0 || start > 31 || start % 3 != 1 {
                    return Err(LayoutError::InvalidStart { kind, start });
                }
            }
            BetLayout::Column { index } | BetLayout::Dozen { index } => {
                if index > 2 {
                    return Err(LayoutError::InvalidIndex { kind, index });
                }
            }
            BetLayout::RedBlack { .. } | BetLayout::EvenOdd { .. } | BetLayout::HighLow { .. } => {}
        }
        Ok(())
    }

    /// Check if this shape wins for a given result. Malformed shapes never win.
    pub fn is_winner(&self, result: u8) -> bool {
        if result > MAX_NUMBER || self.validate().is_err() {
            return false;
        }
        // Zero loses everything except a straight bet on 0
        if result == 0 {
            return matches!(self, BetLayout::Straight { number: 0 });
        }

        match *self {
            BetLayout::Straight { number } => number == result,
            BetLayout::Split { first, second } => result == first || result == second,
            BetLayout::Street { start } => (start..start + 3).contains(&result),
            BetLayout::Corner { start } => [start, start + 1, start + 3, start + 4].contains(&result),
            BetLayout::SixLine { start } => (start..start + 6).contains(&result),
            BetLayout::Column { index } => (result - 1) % 3 == index,
            BetLayout::Dozen { index } => (result - 1) / 12 == index,
            BetLayout::RedBlack { red } => is_red(result) == red,
            BetLayout::EvenOdd { even } => (result % 2 == 0) == even,
            BetLayout::HighLow { high } => (result >= 19) == high,
        }
    }

    /// Numbers this shape pays out on, ascending.
    pub fn covered_numbers(&self) -> Vec<u8> {
        (0..=MAX_NUMBER).filter(|n| self.is_winner(*n)).collect()
    }
}

/// Stable identifier of a physical bet area on the table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SlotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SlotId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One chip stacked on a bet area, kept so the table can be redrawn after a restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipRecord {
    pub amount: u64,
    pub stack_index: u32,
}

impl ChipRecord {
    pub fn stack_height(&self) -> f32 {
        self.stack_index as f32 * CHIP_STACK_OFFSET
    }
}

/// A stake on one table slot.
///
/// A slot accumulates stake across placements but stays one logical wager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub slot: SlotId,
    pub layout: BetLayout,
    pub amount: u64,
    #[serde(default)]
    pub chips: Vec<ChipRecord>,
}

impl Wager {
    pub fn new(slot: SlotId, layout: BetLayout) -> Self {
        Self {
            slot,
            layout,
            amount: 0,
            chips: Vec::new(),
        }
    }

    pub fn kind(&self) -> BetKind {
        self.layout.kind()
    }

    pub fn is_winner(&self, result: u8) -> bool {
        self.layout.is_winner(result)
    }

    /// Winnings this wager earns if it wins, or `None` on overflow.
    pub fn payout(&self) -> Option<u64> {
        self.kind().payout(self.amount)
    }

    /// Stack another chip on this wager. Returns `None` (and leaves the wager untouched) on overflow.
    pub fn push_chip(&mut self, amount: u64) -> Option<&ChipRecord> {
        let total = self.amount.checked_add(amount)?;
        let stack_index = u32::try_from(self.chips.len()).ok()?;
        self.amount = total;
        self.chips.push(ChipRecord {
            amount,
            stack_index,
        });
        self.chips.last()
    }

    /// Sum of the stacked chips, or `None` on overflow.
    pub fn chips_total(&self) -> Option<u64> {
        self.chips
            .iter()
            .try_fold(0u64, |acc, chip| acc.checked_add(chip.amount))
    }
}
