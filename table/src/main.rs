use anyhow::{Context, Result};
use clap::Parser;
use roulette_execution::events::TableEvent;
use roulette_execution::outcome::RouletteOutcome;
use roulette_execution::table::Table;
use roulette_table::command::{self, Request};
use roulette_table::{spawn_table, store, telemetry, Config, HandleError, TableHandle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Single-table roulette host")]
struct Args {
    /// YAML configuration file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Log the events a player would notice; ball samples are left to a renderer.
async fn report_events(mut events: tokio::sync::broadcast::Receiver<TableEvent>) {
    loop {
        match events.recv().await {
            Ok(TableEvent::BallMoved(_)) => {}
            Ok(TableEvent::Settled(summary)) => info!(
                number = summary.number,
                winnings = summary.total_winnings,
                lost = summary.total_lost,
                net = summary.net,
                "round settled"
            ),
            Ok(TableEvent::BalanceChanged(view)) => info!(
                balance = view.balance,
                in_flight = view.in_flight_stake,
                "balance"
            ),
            Ok(TableEvent::PersistenceFailed { reason }) => {
                warn!(reason = %reason, "table state not saved, will retry")
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event reporter lagged"),
            Err(RecvError::Closed) => return,
        }
    }
}

async fn handle_line(handle: &TableHandle, line: &str) -> Result<bool, HandleError> {
    let request = match command::parse(line) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "could not parse command");
            return Ok(true);
        }
    };
    match request {
        Request::Bet {
            slot,
            layout,
            amount,
        } => {
            let total = handle.place_bet(slot.clone(), layout, amount).await?;
            info!(%slot, amount, total, "bet placed");
        }
        Request::Confirm => {
            handle.confirm().await?;
            info!("no more bets");
        }
        Request::Reset => {
            let refunded = handle.reset_bets().await?;
            info!(refunded, "bets reset");
        }
        Request::Credit => {
            let balance = handle.add_free_credit().await?;
            info!(balance, "free credit added");
        }
        Request::Override(number) => {
            handle.set_override(number).await?;
            info!(number, "next spin fixed");
        }
        Request::Status => {
            let status = handle.status().await?;
            info!(?status, "status");
        }
        Request::Quit => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let level = telemetry::parse_level(&config.log_level)?;
    telemetry::init_tracing(level, config.json_logs)?;
    info!(config = %config.summary(), "loaded config");
    if args.dry_run {
        info!("config ok");
        return Ok(());
    }

    let store = store::open(&config.store).context("failed to open table store")?;
    let table = Table::new(
        config.table.clone(),
        config.wheel.geometry(),
        RouletteOutcome::from_seed(config.table.deterministic_seed),
        config.wheel.locator(),
        store,
    )
    .context("failed to build table")?;

    let (handle, task) = spawn_table(table, Duration::from_millis(config.tick_ms));
    let reporter = tokio::spawn(report_events(handle.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match handle_line(&handle, &line).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(HandleError::Rejected(err)) => warn!(error = %err, "request rejected"),
                    Err(HandleError::Closed) => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    match handle.shutdown().await {
        Ok(true) => info!("table state saved"),
        Ok(false) => warn!("final save failed; last durable state will be restored"),
        Err(HandleError::Closed) | Err(HandleError::Rejected(_)) => {}
    }
    drop(handle);
    let result = task.await.context("table task panicked")?;
    reporter.abort();
    result
}
