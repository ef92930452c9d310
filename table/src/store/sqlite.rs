use anyhow::Context;
use roulette_execution::persistence::{PersistenceError, PersistenceGateway};
use roulette_types::casino::{Account, BetLayout, ChipRecord, RoundStats, SlotId, Snapshot, Wager};
use rusqlite::{params, Connection, OptionalExtension};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// SQLite-backed store. Each save rewrites every table inside one transaction.
///
/// A database whose rows fail to decode is copied to `<path>.corrupt` and emptied before
/// `load` reports it, so the next save cannot overwrite the only copy.
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=FULL;
         CREATE TABLE IF NOT EXISTS account (
             id INTEGER PRIMARY KEY CHECK (id = 0),
             version INTEGER NOT NULL,
             balance INTEGER NOT NULL,
             in_flight_stake INTEGER NOT NULL,
             last_settlement INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS stats (
             id INTEGER PRIMARY KEY CHECK (id = 0),
             total_spins INTEGER NOT NULL,
             total_wins INTEGER NOT NULL,
             total_profit INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS wagers (
             slot TEXT PRIMARY KEY,
             layout TEXT NOT NULL,
             amount INTEGER NOT NULL,
             chips TEXT NOT NULL
         );",
    )
    .context("init table store schema")?;
    Ok(())
}

fn backend(err: rusqlite::Error) -> PersistenceError {
    PersistenceError::Backend(err.to_string())
}

fn corrupt(what: &str, err: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Corrupt(format!("{what}: {err}"))
}

fn to_sql(value: u64, what: &str) -> Result<i64, PersistenceError> {
    i64::try_from(value).map_err(|_| PersistenceError::Backend(format!("{what} exceeds i64")))
}

fn from_sql(value: i64, what: &str) -> Result<u64, PersistenceError> {
    u64::try_from(value).map_err(|_| PersistenceError::Corrupt(format!("{what} is negative")))
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open table store {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory table store")?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    fn corrupt_path(&self) -> Option<PathBuf> {
        self.path.as_ref().map(|path| {
            let mut name = OsString::from(path.as_os_str());
            name.push(".corrupt");
            PathBuf::from(name)
        })
    }

    /// Copy the database aside, then empty it.
    fn quarantine(&mut self) -> Result<Option<PathBuf>, PersistenceError> {
        let aside = self.corrupt_path();
        if let Some(aside) = &aside {
            match std::fs::remove_file(aside) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(PersistenceError::Io(err.to_string())),
            }
            let target = aside.to_str().ok_or_else(|| {
                PersistenceError::Io(format!("non-utf8 store path {}", aside.display()))
            })?;
            self.conn
                .execute("VACUUM INTO ?1", params![target])
                .map_err(backend)?;
        }
        let tx = self.conn.transaction().map_err(backend)?;
        tx.execute_batch("DELETE FROM wagers; DELETE FROM stats; DELETE FROM account;")
            .map_err(backend)?;
        tx.commit().map_err(backend)?;
        Ok(aside)
    }

    fn read_snapshot(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let account = self
            .conn
            .query_row(
                "SELECT version, balance, in_flight_stake, last_settlement FROM account WHERE id = 0",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(backend)?;
        let Some((version, balance, in_flight_stake, last_settlement)) = account else {
            return Ok(None);
        };
        let version = u32::try_from(version).map_err(|err| corrupt("version", err))?;
        let account = Account {
            balance: from_sql(balance, "balance")?,
            in_flight_stake: from_sql(in_flight_stake, "in_flight_stake")?,
            last_settlement,
        };

        let stats = self
            .conn
            .query_row(
                "SELECT total_spins, total_wins, total_profit FROM stats WHERE id = 0",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(backend)?;
        let stats = match stats {
            Some((spins, wins, profit)) => RoundStats {
                total_spins: from_sql(spins, "total_spins")?,
                total_wins: from_sql(wins, "total_wins")?,
                total_profit: profit,
            },
            None => RoundStats::default(),
        };

        let mut stmt = self
            .conn
            .prepare("SELECT slot, layout, amount, chips FROM wagers ORDER BY slot")
            .map_err(backend)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(backend)?;
        let mut wagers = Vec::new();
        for row in rows {
            let (slot, layout, amount, chips) = row.map_err(backend)?;
            let layout: BetLayout =
                serde_json::from_str(&layout).map_err(|err| corrupt("wager layout", err))?;
            let chips: Vec<ChipRecord> =
                serde_json::from_str(&chips).map_err(|err| corrupt("wager chips", err))?;
            wagers.push(Wager {
                slot: SlotId::new(slot),
                layout,
                amount: from_sql(amount, "wager amount")?,
                chips,
            });
        }

        Ok(Some(Snapshot {
            version,
            account,
            stats,
            wagers,
        }))
    }
}

impl PersistenceGateway for SqliteStore {
    fn load(&mut self) -> Result<Option<Snapshot>, PersistenceError> {
        match self.read_snapshot() {
            Err(PersistenceError::Corrupt(reason)) => {
                let aside = self.quarantine()?;
                let aside = aside
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "discarded".to_string());
                warn!(reason = %reason, aside = %aside, "corrupt table state set aside");
                Err(PersistenceError::Corrupt(format!("{reason} (moved to {aside})")))
            }
            other => other,
        }
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction().map_err(backend)?;
        tx.execute(
            "INSERT OR REPLACE INTO account (id, version, balance, in_flight_stake, last_settlement)
             VALUES (0, ?1, ?2, ?3, ?4)",
            params![
                i64::from(snapshot.version),
                to_sql(snapshot.account.balance, "balance")?,
                to_sql(snapshot.account.in_flight_stake, "in_flight_stake")?,
                snapshot.account.last_settlement,
            ],
        )
        .map_err(backend)?;
        tx.execute(
            "INSERT OR REPLACE INTO stats (id, total_spins, total_wins, total_profit)
             VALUES (0, ?1, ?2, ?3)",
            params![
                to_sql(snapshot.stats.total_spins, "total_spins")?,
                to_sql(snapshot.stats.total_wins, "total_wins")?,
                snapshot.stats.total_profit,
            ],
        )
        .map_err(backend)?;
        tx.execute("DELETE FROM wagers", []).map_err(backend)?;
        for wager in &snapshot.wagers {
            let layout = serde_json::to_string(&wager.layout)
                .map_err(|err| PersistenceError::Backend(err.to_string()))?;
            let chips = serde_json::to_string(&wager.chips)
                .map_err(|err| PersistenceError::Backend(err.to_string()))?;
            tx.execute(
                "INSERT INTO wagers (slot, layout, amount, chips) VALUES (?1, ?2, ?3, ?4)",
                params![
                    wager.slot.as_str(),
                    layout,
                    to_sql(wager.amount, "wager amount")?,
                    chips
                ],
            )
            .map_err(backend)?;
        }
        tx.commit().map_err(backend)?;
        debug!(
            balance = snapshot.account.balance,
            wagers = snapshot.wagers.len(),
            "table state saved"
        );
        Ok(())
    }
}
