use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::STARTING_BALANCE;

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum AccountError {
    #[error("bet amount must be positive")]
    InvalidAmount,
    #[error("insufficient funds (requested={requested}, available={available})")]
    InsufficientFunds { requested: u64, available: u64 },
    #[error("account invariant violated: {0}")]
    InvariantViolation(String),
}

fn overflow(op: &str) -> AccountError {
    AccountError::InvariantViolation(format!("{op} overflow"))
}

/// Player money.
///
/// `balance` is what can still be staked, `in_flight_stake` is what sits on the felt for the
/// current round. Every mutation is checked; nothing here ever wraps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub balance: u64,
    pub in_flight_stake: u64,
    /// Net result of the last settlement (winnings minus lost stake).
    pub last_settlement: i64,
}

impl Default for Account {
    fn default() -> Self {
        Self::with_balance(STARTING_BALANCE)
    }
}

impl Account {
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            in_flight_stake: 0,
            last_settlement: 0,
        }
    }

    /// Move `amount` from the balance onto the felt.
    pub fn place_bet(&mut self, amount: u64) -> Result<(), AccountError> {
        if amount == 0 {
            return Err(AccountError::InvalidAmount);
        }
        if amount > self.balance {
            return Err(AccountError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        let in_flight = self
            .in_flight_stake
            .checked_add(amount)
            .ok_or_else(|| overflow("in-flight stake"))?;
        self.balance -= amount;
        self.in_flight_stake = in_flight;
        Ok(())
    }

    /// Resolve the in-flight stake against a round result.
    ///
    /// The stake of winning wagers (`in_flight_stake - lost_stake`) comes back together with the
    /// winnings; lost stake is gone. Returns the new `last_settlement`.
    pub fn process_payment(&mut self, winnings: u64, lost_stake: u64) -> Result<i64, AccountError> {
        let returned = self.in_flight_stake.checked_sub(lost_stake).ok_or_else(|| {
            AccountError::InvariantViolation(format!(
                "lost stake {lost_stake} exceeds in-flight stake {}",
                self.in_flight_stake
            ))
        })?;
        let net = i64::try_from(winnings)
            .ok()
            .zip(i64::try_from(lost_stake).ok())
            .and_then(|(won, lost)| won.checked_sub(lost))
            .ok_or_else(|| overflow("settlement"))?;

        let balance = if winnings > 0 {
            let settlement = winnings
                .checked_add(returned)
                .ok_or_else(|| overflow("settlement"))?;
            self.balance
                .checked_add(settlement)
                .ok_or_else(|| overflow("balance"))?
        } else {
            self.balance
        };

        self.balance = balance;
        self.in_flight_stake = 0;
        self.last_settlement = net;
        Ok(net)
    }

    /// Return the whole in-flight stake to the balance (bets cleared before a spin).
    pub fn refund_in_flight(&mut self) -> Result<u64, AccountError> {
        let refunded = self.in_flight_stake;
        self.balance = self
            .balance
            .checked_add(refunded)
            .ok_or_else(|| overflow("balance"))?;
        self.in_flight_stake = 0;
        Ok(refunded)
    }

    pub fn add_free_credit(&mut self, amount: u64) -> Result<(), AccountError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| overflow("balance"))?;
        Ok(())
    }

    /// Balance plus in-flight stake, or `None` on overflow.
    pub fn total_funds(&self) -> Option<u64> {
        self.balance.checked_add(self.in_flight_stake)
    }
}

/// Lifetime counters for the table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundStats {
    pub total_spins: u64,
    pub total_wins: u64,
    pub total_profit: i64,
}

impl RoundStats {
    pub fn record_spin(&mut self) -> Result<(), AccountError> {
        self.total_spins = self
            .total_spins
            .checked_add(1)
            .ok_or_else(|| overflow("total spins"))?;
        Ok(())
    }

    pub fn record_settlement(&mut self, won: bool, net: i64) -> Result<(), AccountError> {
        let total_wins = if won {
            self.total_wins
                .checked_add(1)
                .ok_or_else(|| overflow("total wins"))?
        } else {
            self.total_wins
        };
        let total_profit = self
            .total_profit
            .checked_add(net)
            .ok_or_else(|| overflow("total profit"))?;
        self.total_wins = total_wins;
        self.total_profit = total_profit;
        Ok(())
    }
}
