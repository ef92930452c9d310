//! Single-table round engine.
//!
//! [`Table`] owns the account, the open wagers and the ball, and advances them through
//! Betting → Spinning → Settlement on each [`Table::tick`]. All collaborators are injected;
//! nothing here reads a clock or touches the filesystem.
//!
//! ## Money invariants
//! - Every money mutation is followed by a save attempt. A failed save leaves the state dirty
//!   and is retried; in-memory money is never discarded because a write failed.
//! - Settlement runs at most once per spin.
//! - Betting-phase placements are the only externally triggered money mutation besides the
//!   demo top-up and the reset path, both also restricted to Betting.

use crate::casino::logging::{format_number_list, format_resolved};
use crate::casino::{BetLedger, LedgerError, SettlementError, SettlementSummary};
use crate::events::{AccountView, TableEvent};
use crate::outcome::{OutcomeError, OutcomeProvider, OutcomeSource};
use crate::persistence::{PersistenceError, PersistenceGateway};
use crate::round_scheduler::{PhaseConfig, RoundScheduler, TransitionResult};
use crate::trajectory::{RollStart, TrajectoryConfig, TrajectorySimulator};
use crate::wheel::{SlotLocator, WheelGeometry};
use glam::Vec3;
use roulette_types::casino::{
    Account, AccountError, BetLayout, LayoutError, RoundPhase, RoundStats, SlotId, Snapshot,
    Wager, FREE_CREDIT_AMOUNT, SNAPSHOT_VERSION, STARTING_BALANCE,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error as ThisError;
use tracing::{debug, error, info, warn};

/// Minimum spacing between save retries while the store is failing.
const PERSIST_RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum TableError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("insufficient funds (requested={requested}, available={available})")]
    InsufficientFunds { requested: u64, available: u64 },
    #[error("bet amount must be positive")]
    InvalidAmount,
    #[error("invalid bet layout: {0}")]
    InvalidLayout(#[from] LayoutError),
    #[error("slot {slot} already holds a different wager ({existing:?})")]
    SlotLayoutMismatch { slot: SlotId, existing: BetLayout },
    #[error("betting is closed (phase={phase})")]
    BettingClosed { phase: RoundPhase },
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
    #[error("table state could not be loaded: {0}")]
    Storage(#[from] PersistenceError),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<AccountError> for TableError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidAmount => TableError::InvalidAmount,
            AccountError::InsufficientFunds {
                requested,
                available,
            } => TableError::InsufficientFunds {
                requested,
                available,
            },
            AccountError::InvariantViolation(reason) => TableError::InvariantViolation(reason),
        }
    }
}

impl From<LedgerError> for TableError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::SlotLayoutMismatch { slot, existing, .. } => {
                TableError::SlotLayoutMismatch { slot, existing }
            }
            LedgerError::Frozen => TableError::BettingClosed {
                phase: RoundPhase::Spinning,
            },
            other => TableError::InvariantViolation(other.to_string()),
        }
    }
}

impl From<SettlementError> for TableError {
    fn from(err: SettlementError) -> Self {
        TableError::InvariantViolation(err.to_string())
    }
}

fn default_starting_balance() -> u64 {
    STARTING_BALANCE
}

fn default_free_credit_amount() -> u64 {
    FREE_CREDIT_AMOUNT
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub phases: PhaseConfig,
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
    /// Balance of a fresh account (no saved state).
    #[serde(default = "default_starting_balance")]
    pub starting_balance: u64,
    #[serde(default = "default_free_credit_amount")]
    pub free_credit_amount: u64,
    /// Seed for the ball's randomness; entropy when absent.
    #[serde(default)]
    pub deterministic_seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            phases: PhaseConfig::default(),
            trajectory: TrajectoryConfig::default(),
            starting_balance: STARTING_BALANCE,
            free_credit_amount: FREE_CREDIT_AMOUNT,
            deterministic_seed: None,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), TableError> {
        self.phases
            .validate()
            .map_err(|reason| TableError::Configuration(reason.to_string()))?;
        self.trajectory
            .validate()
            .map_err(|reason| TableError::Configuration(reason.to_string()))?;
        if self.free_credit_amount == 0 {
            return Err(TableError::Configuration(
                "free_credit_amount must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub struct Table<O, L, P> {
    config: TableConfig,
    scheduler: RoundScheduler,
    outcome: O,
    locator: L,
    store: P,
    simulator: TrajectorySimulator,

    phase: RoundPhase,
    round_id: u64,
    account: Account,
    stats: RoundStats,
    ledger: BetLedger,

    winning_number: Option<u8>,
    last_target: Vec3,
    phase_elapsed: Duration,
    roll_finished: bool,
    settled: bool,

    dirty: bool,
    since_retry: Duration,
    events: Vec<TableEvent>,
}

impl<O, L, P> Table<O, L, P>
where
    O: OutcomeProvider,
    L: SlotLocator,
    P: PersistenceGateway,
{
    /// Build a table and restore whatever the store holds.
    pub fn new(
        config: TableConfig,
        geometry: WheelGeometry,
        outcome: O,
        locator: L,
        mut store: P,
    ) -> Result<Self, TableError> {
        config.validate()?;
        geometry
            .validate()
            .map_err(|reason| TableError::Configuration(reason.to_string()))?;

        let fresh = Snapshot {
            version: SNAPSHOT_VERSION,
            account: Account::with_balance(config.starting_balance),
            stats: RoundStats::default(),
            wagers: Vec::new(),
        };
        let snapshot = match store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!(balance = config.starting_balance, "no saved table state, starting fresh");
                fresh
            }
            // The store has moved the bad record aside, so a fresh save cannot clobber it
            Err(err @ PersistenceError::Corrupt(_)) => {
                error!(error = %err, "saved table state is corrupt, starting fresh");
                fresh
            }
            Err(err) => {
                error!(error = %err, "failed to load table state");
                return Err(err.into());
            }
        };

        let simulator = TrajectorySimulator::from_seed(
            config.trajectory.clone(),
            geometry.clone(),
            config.deterministic_seed,
        );
        let scheduler = RoundScheduler::new(config.phases);
        let mut table = Self {
            config,
            scheduler,
            outcome,
            locator,
            store,
            simulator,
            phase: RoundPhase::Betting,
            round_id: 0,
            account: snapshot.account.clone(),
            stats: snapshot.stats.clone(),
            ledger: BetLedger::new(),
            winning_number: None,
            last_target: geometry.center,
            phase_elapsed: Duration::ZERO,
            roll_finished: false,
            settled: false,
            dirty: false,
            since_retry: Duration::ZERO,
            events: Vec::new(),
        };
        table.restore_wagers(snapshot)?;
        Ok(table)
    }

    /// Reopen the saved wager set, or hand its stake back if it cannot be trusted.
    fn restore_wagers(&mut self, snapshot: Snapshot) -> Result<(), TableError> {
        let restored = match snapshot.validate() {
            Ok(()) => self.ledger.restore(snapshot.wagers).map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        match restored {
            Ok(()) => {
                if !self.ledger.is_empty() {
                    info!(
                        wagers = self.ledger.len(),
                        in_flight = self.account.in_flight_stake,
                        "restored open wagers"
                    );
                }
            }
            Err(reason) => {
                self.ledger.clear();
                let refunded = self.account.refund_in_flight()?;
                warn!(reason = %reason, refunded, "saved wagers inconsistent, stake refunded");
                self.persist();
            }
        }
        Ok(())
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn stats(&self) -> &RoundStats {
        &self.stats
    }

    pub fn wagers(&self) -> impl Iterator<Item = &Wager> {
        self.ledger.wagers()
    }

    pub fn winning_number(&self) -> Option<u8> {
        self.winning_number
    }

    pub fn is_betting_enabled(&self) -> bool {
        self.scheduler.is_betting_open(self.phase) && !self.ledger.is_frozen()
    }

    /// Whether the last save attempt failed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn ball_position(&self) -> Vec3 {
        self.simulator.position()
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn drain_events(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.events)
    }

    /// The record that would be saved right now.
    ///
    /// Once a round is settled its wagers are resolved, so none are written.
    pub fn snapshot(&self) -> Snapshot {
        let wagers = if self.settled {
            Vec::new()
        } else {
            self.ledger.wagers().cloned().collect()
        };
        Snapshot {
            version: SNAPSHOT_VERSION,
            account: self.account.clone(),
            stats: self.stats.clone(),
            wagers,
        }
    }

    fn require_betting(&self) -> Result<(), TableError> {
        if !self.is_betting_enabled() {
            warn!(phase = %self.phase, round_id = self.round_id, "rejected: betting closed");
            return Err(TableError::BettingClosed { phase: self.phase });
        }
        Ok(())
    }

    fn push_balance(&mut self) {
        self.events
            .push(TableEvent::BalanceChanged(AccountView::from(&self.account)));
    }

    fn set_phase(&mut self, phase: RoundPhase) {
        self.phase = phase;
        self.phase_elapsed = Duration::ZERO;
        info!(round_id = self.round_id, phase = %phase, "phase changed");
        self.events.push(TableEvent::PhaseChanged {
            round_id: self.round_id,
            phase,
        });
    }

    /// Save the current snapshot. Failures mark the table dirty for a later retry.
    fn persist(&mut self) {
        let snapshot = self.snapshot();
        self.since_retry = Duration::ZERO;
        match self.store.save(&snapshot) {
            Ok(()) => {
                if self.dirty {
                    info!(round_id = self.round_id, "table state persisted after failure");
                    self.events.push(TableEvent::PersistenceRecovered);
                }
                self.dirty = false;
            }
            Err(err) => {
                if self.dirty {
                    warn!(round_id = self.round_id, error = %err, "table state still not persisted");
                } else {
                    error!(round_id = self.round_id, error = %err, "failed to persist table state");
                    self.events.push(TableEvent::PersistenceFailed {
                        reason: err.to_string(),
                    });
                }
                self.dirty = true;
            }
        }
    }

    /// Stake `amount` on `slot`. Returns the slot's new total.
    pub fn place_bet(
        &mut self,
        slot: SlotId,
        layout: BetLayout,
        amount: u64,
    ) -> Result<u64, TableError> {
        self.require_betting()?;
        if let Err(err) = layout.validate() {
            warn!(%slot, error = %err, "rejected: invalid layout");
            return Err(err.into());
        }
        self.ledger.check_place(&slot, layout, amount)?;
        if let Err(err) = self.account.place_bet(amount) {
            warn!(%slot, amount, error = %err, "rejected bet");
            return Err(err.into());
        }

        // check_place passed above, so this cannot fail after the debit
        let (kind, slot_total) = self
            .ledger
            .place(slot.clone(), layout, amount)
            .map(|wager| (wager.kind(), wager.amount))
            .map_err(|err| TableError::InvariantViolation(err.to_string()))?;
        debug!(
            round_id = self.round_id,
            %slot,
            %kind,
            amount,
            slot_total,
            covers = %format_number_list(&layout.covered_numbers()),
            "bet placed"
        );
        self.events.push(TableEvent::BetPlaced {
            slot,
            kind,
            amount,
            slot_total,
        });
        self.push_balance();
        self.persist();
        Ok(slot_total)
    }

    /// Take every open wager back. Returns the refunded stake.
    pub fn reset_bets(&mut self) -> Result<u64, TableError> {
        self.require_betting()?;
        let refunded = self.account.refund_in_flight()?;
        self.ledger.clear();
        info!(round_id = self.round_id, refunded, "bets reset");
        self.events.push(TableEvent::BetsReset { refunded });
        self.push_balance();
        self.persist();
        Ok(refunded)
    }

    /// Demo top-up. Returns the new balance.
    pub fn add_free_credit(&mut self) -> Result<u64, TableError> {
        self.require_betting()?;
        let amount = self.config.free_credit_amount;
        self.account.add_free_credit(amount)?;
        info!(amount, balance = self.account.balance, "free credit added");
        self.push_balance();
        self.persist();
        Ok(self.account.balance)
    }

    /// Fix the next spin's number.
    pub fn set_override(&mut self, number: u8) -> Result<(), TableError> {
        if let Err(err) = self.outcome.set_override(number) {
            warn!(number, error = %err, "rejected override");
            return Err(err.into());
        }
        info!(number, "override armed");
        Ok(())
    }

    /// Close betting and release the ball. Returns the winning number.
    ///
    /// Fails closed: on any configuration problem the table stays in Betting with its wagers
    /// open, and an override consumed by the attempt is armed again.
    pub fn confirm(&mut self) -> Result<u8, TableError> {
        self.require_betting()?;
        if self.simulator.is_rolling() {
            error!(round_id = self.round_id, "ball already rolling while betting");
            return Err(TableError::InvariantViolation(
                "ball already rolling".to_string(),
            ));
        }

        let outcome = self.outcome.draw_number().map_err(|err| {
            error!(round_id = self.round_id, error = %err, "no winning number, staying in betting");
            TableError::Configuration(err.to_string())
        })?;
        let number = outcome.number;
        let target = match self.locator.slot_position(number, 0.0) {
            Some(target) => target,
            None => {
                if outcome.source == OutcomeSource::Override {
                    let _ = self.outcome.set_override(number);
                }
                error!(round_id = self.round_id, number, "no pocket for winning number, staying in betting");
                return Err(TableError::Configuration(format!(
                    "no slot mapped for number {number}"
                )));
            }
        };

        self.stats.record_spin()?;
        self.ledger.freeze();
        self.winning_number = Some(number);
        self.last_target = target;
        self.roll_finished = false;
        self.settled = false;
        if self.simulator.start_rolling(number, target) == RollStart::AlreadyRolling {
            return Err(TableError::InvariantViolation(
                "re-entrant roll".to_string(),
            ));
        }

        info!(
            round_id = self.round_id,
            number,
            wagers = self.ledger.len(),
            in_flight = self.account.in_flight_stake,
            "spin started"
        );
        self.set_phase(RoundPhase::Spinning);
        self.events.push(TableEvent::StatsChanged(self.stats.clone()));
        self.persist();
        Ok(number)
    }

    /// Advance the round by `dt`.
    pub fn tick(&mut self, dt: Duration) -> Result<(), TableError> {
        if self.dirty {
            self.since_retry = self.since_retry.saturating_add(dt);
            if self.since_retry >= PERSIST_RETRY_INTERVAL {
                self.persist();
            }
        }

        match self.phase {
            RoundPhase::Betting => Ok(()),
            RoundPhase::Spinning => self.tick_spinning(dt),
            RoundPhase::Settlement => {
                self.phase_elapsed = self.phase_elapsed.saturating_add(dt);
                match self.scheduler.check_transition(
                    self.phase,
                    duration_ms(self.phase_elapsed),
                    false,
                ) {
                    TransitionResult::TransitionTo(RoundPhase::Betting) => self.finish_round(),
                    _ => Ok(()),
                }
            }
        }
    }

    fn tick_spinning(&mut self, dt: Duration) -> Result<(), TableError> {
        self.phase_elapsed = self.phase_elapsed.saturating_add(dt);
        let number = self.winning_number.ok_or_else(|| {
            TableError::InvariantViolation("spinning without a winning number".to_string())
        })?;

        if !self.roll_finished {
            let elapsed_secs = self.phase_elapsed.as_secs_f32();
            match self.locator.slot_position(number, elapsed_secs) {
                Some(target) => self.last_target = target,
                None => warn!(number, "pocket disappeared mid-spin, using last position"),
            }
            if let Some(step) = self.simulator.step(dt.as_secs_f32(), self.last_target) {
                self.events.push(TableEvent::BallMoved(step.sample));
                if let Some(finished) = step.finished {
                    debug!(round_id = self.round_id, number = finished, "rolling finished");
                    self.roll_finished = true;
                    self.events
                        .push(TableEvent::RollingFinished { number: finished });
                }
            }
        }

        let elapsed_ms = duration_ms(self.phase_elapsed);
        match self
            .scheduler
            .check_transition(self.phase, elapsed_ms, self.roll_finished)
        {
            TransitionResult::TransitionTo(RoundPhase::Settlement) => self.settle(),
            TransitionResult::SpinTimedOut => {
                error!(
                    round_id = self.round_id,
                    number,
                    elapsed_ms,
                    "ball did not settle in time, settling on fixed number"
                );
                self.events.push(TableEvent::SpinTimedOut { elapsed_ms });
                self.simulator.abandon();
                self.settle()
            }
            _ => Ok(()),
        }
    }

    /// Resolve every wager against the fixed number. Runs once per spin.
    fn settle(&mut self) -> Result<(), TableError> {
        if self.settled || !self.scheduler.can_settle(self.phase) {
            error!(round_id = self.round_id, phase = %self.phase, "settlement attempted twice");
            return Err(TableError::InvariantViolation(
                "double settlement".to_string(),
            ));
        }
        let number = self.winning_number.ok_or_else(|| {
            TableError::InvariantViolation("settling without a winning number".to_string())
        })?;

        let mut summary: SettlementSummary = self.ledger.evaluate(number)?;
        let net = self
            .account
            .process_payment(summary.total_winnings, summary.total_lost)?;
        summary.net = net;
        self.stats.record_settlement(summary.any_won(), net)?;
        self.settled = true;

        info!(
            round_id = self.round_id,
            number,
            winnings = summary.total_winnings,
            lost = summary.total_lost,
            net,
            balance = self.account.balance,
            resolved = %format_resolved(&summary.outcomes),
            "round settled"
        );
        for outcome in &summary.outcomes {
            self.events.push(TableEvent::WagerResolved {
                slot: outcome.slot.clone(),
                kind: outcome.kind,
                won: outcome.won,
                payout: outcome.payout,
            });
        }
        self.events.push(TableEvent::Settled(summary));
        self.push_balance();
        self.events.push(TableEvent::StatsChanged(self.stats.clone()));
        self.set_phase(RoundPhase::Settlement);
        self.persist();
        Ok(())
    }

    fn finish_round(&mut self) -> Result<(), TableError> {
        self.ledger.clear();
        self.winning_number = None;
        self.roll_finished = false;
        self.settled = false;
        self.round_id = self
            .round_id
            .checked_add(1)
            .ok_or_else(|| TableError::InvariantViolation("round id overflow".to_string()))?;
        self.set_phase(RoundPhase::Betting);
        self.persist();
        Ok(())
    }

    /// Flush state before the process is suspended or stopped. Returns whether the save held.
    pub fn suspend(&mut self) -> bool {
        info!(round_id = self.round_id, phase = %self.phase, "suspending table");
        self.persist();
        !self.dirty
    }
}
