//! Async driver that owns one [`Table`] on a single tokio task.
//!
//! UI collaborators talk to the task through a [`TableHandle`]: commands go over an `mpsc`
//! channel with `oneshot` replies, and drained table events fan out on a `broadcast` channel.
//! Ticks and commands are processed one at a time, so the table never sees concurrent access.

use anyhow::Context;
use roulette_execution::events::TableEvent;
use roulette_execution::outcome::OutcomeProvider;
use roulette_execution::persistence::PersistenceGateway;
use roulette_execution::table::{Table, TableError};
use roulette_execution::wheel::SlotLocator;
use roulette_types::casino::{BetLayout, RoundPhase, SlotId};
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 1_024;
const MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum HandleError {
    #[error("table task is not running")]
    Closed,
    #[error(transparent)]
    Rejected(#[from] TableError),
}

/// Point-in-time view for status displays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableStatus {
    pub phase: RoundPhase,
    pub round_id: u64,
    pub balance: u64,
    pub in_flight_stake: u64,
    pub last_settlement: i64,
    pub winning_number: Option<u8>,
    pub betting_enabled: bool,
    pub wagers: usize,
    pub dirty: bool,
}

type Reply<T> = oneshot::Sender<Result<T, TableError>>;

pub enum Command {
    PlaceBet {
        slot: SlotId,
        layout: BetLayout,
        amount: u64,
        reply: Reply<u64>,
    },
    Confirm {
        reply: Reply<u8>,
    },
    ResetBets {
        reply: Reply<u64>,
    },
    AddFreeCredit {
        reply: Reply<u64>,
    },
    SetOverride {
        number: u8,
        reply: Reply<()>,
    },
    Status {
        reply: oneshot::Sender<TableStatus>,
    },
    /// Flush and stop. Replies whether the final save held.
    Shutdown {
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Clone)]
pub struct TableHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<TableEvent>,
}

impl TableHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, HandleError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| HandleError::Closed)?;
        response.await.map_err(|_| HandleError::Closed)
    }

    pub async fn place_bet(
        &self,
        slot: SlotId,
        layout: BetLayout,
        amount: u64,
    ) -> Result<u64, HandleError> {
        Ok(self
            .request(|reply| Command::PlaceBet {
                slot,
                layout,
                amount,
                reply,
            })
            .await??)
    }

    pub async fn confirm(&self) -> Result<u8, HandleError> {
        Ok(self.request(|reply| Command::Confirm { reply }).await??)
    }

    pub async fn reset_bets(&self) -> Result<u64, HandleError> {
        Ok(self.request(|reply| Command::ResetBets { reply }).await??)
    }

    pub async fn add_free_credit(&self) -> Result<u64, HandleError> {
        Ok(self
            .request(|reply| Command::AddFreeCredit { reply })
            .await??)
    }

    pub async fn set_override(&self, number: u8) -> Result<(), HandleError> {
        Ok(self
            .request(|reply| Command::SetOverride { number, reply })
            .await??)
    }

    pub async fn status(&self) -> Result<TableStatus, HandleError> {
        self.request(|reply| Command::Status { reply }).await
    }

    pub async fn shutdown(&self) -> Result<bool, HandleError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

/// Start the table task. The task ends on `Shutdown`, when every handle is dropped, or on an
/// invariant violation (returned as the task's error).
pub fn spawn_table<O, L, P>(
    table: Table<O, L, P>,
    tick: Duration,
) -> (TableHandle, JoinHandle<anyhow::Result<()>>)
where
    O: OutcomeProvider + Send + 'static,
    L: SlotLocator + Send + 'static,
    P: PersistenceGateway + Send + 'static,
{
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    let handle = TableHandle {
        commands,
        events: events.clone(),
    };
    let task = tokio::spawn(run(table, tick.max(MIN_TICK), receiver, events));
    (handle, task)
}

fn status<O, L, P>(table: &Table<O, L, P>) -> TableStatus
where
    O: OutcomeProvider,
    L: SlotLocator,
    P: PersistenceGateway,
{
    TableStatus {
        phase: table.phase(),
        round_id: table.round_id(),
        balance: table.account().balance,
        in_flight_stake: table.account().in_flight_stake,
        last_settlement: table.account().last_settlement,
        winning_number: table.winning_number(),
        betting_enabled: table.is_betting_enabled(),
        wagers: table.wagers().count(),
        dirty: table.is_dirty(),
    }
}

fn publish<O, L, P>(table: &mut Table<O, L, P>, events: &broadcast::Sender<TableEvent>)
where
    O: OutcomeProvider,
    L: SlotLocator,
    P: PersistenceGateway,
{
    for event in table.drain_events() {
        // No subscribers is fine
        let _ = events.send(event);
    }
}

/// Apply one command. Returns the invariant violation that must stop the task, if any.
fn apply<O, L, P>(table: &mut Table<O, L, P>, command: Command) -> Option<TableError>
where
    O: OutcomeProvider,
    L: SlotLocator,
    P: PersistenceGateway,
{
    fn answer<T>(reply: Reply<T>, result: Result<T, TableError>) -> Option<TableError> {
        let fatal = match &result {
            Err(err @ TableError::InvariantViolation(_)) => Some(err.clone()),
            _ => None,
        };
        let _ = reply.send(result);
        fatal
    }

    match command {
        Command::PlaceBet {
            slot,
            layout,
            amount,
            reply,
        } => answer(reply, table.place_bet(slot, layout, amount)),
        Command::Confirm { reply } => answer(reply, table.confirm()),
        Command::ResetBets { reply } => answer(reply, table.reset_bets()),
        Command::AddFreeCredit { reply } => answer(reply, table.add_free_credit()),
        Command::SetOverride { number, reply } => answer(reply, table.set_override(number)),
        Command::Status { reply } => {
            let _ = reply.send(status(table));
            None
        }
        // Handled by the loop
        Command::Shutdown { .. } => None,
    }
}

async fn run<O, L, P>(
    mut table: Table<O, L, P>,
    tick: Duration,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<TableEvent>,
) -> anyhow::Result<()>
where
    O: OutcomeProvider,
    L: SlotLocator,
    P: PersistenceGateway,
{
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    info!(tick_ms = tick.as_millis() as u64, round_id = table.round_id(), "table task started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.saturating_duration_since(last);
                last = now;
                if let Err(err) = table.tick(dt) {
                    error!(error = %err, round_id = table.round_id(), "table tick failed, stopping");
                    table.suspend();
                    publish(&mut table, &events);
                    return Err(err).context("table tick failed");
                }
            }
            command = commands.recv() => match command {
                None => {
                    info!("all table handles dropped, stopping");
                    table.suspend();
                    publish(&mut table, &events);
                    return Ok(());
                }
                Some(Command::Shutdown { reply }) => {
                    let persisted = table.suspend();
                    publish(&mut table, &events);
                    info!(persisted, "table task shut down");
                    let _ = reply.send(persisted);
                    return Ok(());
                }
                Some(command) => {
                    if let Some(err) = apply(&mut table, command) {
                        error!(error = %err, round_id = table.round_id(), "invariant violated, stopping");
                        table.suspend();
                        publish(&mut table, &events);
                        return Err(err).context("table command failed");
                    }
                }
            },
        }
        publish(&mut table, &events);
    }
}
