use anyhow::Context;
use roulette_execution::persistence::{PersistenceError, PersistenceGateway};
use roulette_types::casino::Snapshot;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Single-file JSON store. Writes go to `<path>.tmp` and are renamed into place.
pub struct JsonFileStore {
    path: PathBuf,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn io(err: std::io::Error) -> PersistenceError {
    PersistenceError::Io(err.to_string())
}

impl JsonFileStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create store directory {}", parent.display()))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        with_suffix(&self.path, ".tmp")
    }

    fn corrupt_path(&self) -> PathBuf {
        with_suffix(&self.path, ".corrupt")
    }
}

impl PersistenceGateway for JsonFileStore {
    fn load(&mut self) -> Result<Option<Snapshot>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io(err)),
        };
        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                // Keep the bad file for inspection; the next save starts clean
                let aside = self.corrupt_path();
                if let Err(rename_err) = fs::rename(&self.path, &aside) {
                    error!(path = %self.path.display(), error = %rename_err, "failed to move corrupt table state aside");
                    return Err(io(rename_err));
                }
                Err(PersistenceError::Corrupt(format!(
                    "{}: {err} (moved to {})",
                    self.path.display(),
                    aside.display()
                )))
            }
        }
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| PersistenceError::Backend(err.to_string()))?;
        let tmp = self.tmp_path();
        let mut file = File::create(&tmp).map_err(io)?;
        file.write_all(&bytes).map_err(io)?;
        file.sync_all().map_err(io)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(io)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "table state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roulette_types::casino::{BetLayout, SlotId, Wager};

    fn store_in(dir: &tempfile::TempDir) -> JsonFileStore {
        JsonFileStore::open(&dir.path().join("table.json")).unwrap()
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_saves_and_loads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let mut snapshot = Snapshot::default();
        snapshot.account.balance = 700;
        snapshot.account.in_flight_stake = 300;
        let mut wager = Wager::new(SlotId::from("d2"), BetLayout::Dozen { index: 1 });
        wager.push_chip(300).unwrap();
        snapshot.wagers.push(wager);

        store.save(&snapshot).unwrap();
        assert!(!store.tmp_path().exists());
        assert_eq!(store.load().unwrap(), Some(snapshot));
    }

    #[test]
    fn test_partial_record_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        fs::write(store.path(), r#"{"account":{"balance":42}}"#).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.account.balance, 42);
        assert_eq!(loaded.account.in_flight_stake, 0);
        assert_eq!(loaded.stats.total_spins, 0);
        assert!(loaded.wagers.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        fs::write(store.path(), b"{ not json").unwrap();

        assert!(matches!(store.load(), Err(PersistenceError::Corrupt(_))));
        assert!(!store.path().exists());
        assert_eq!(fs::read(store.corrupt_path()).unwrap(), b"{ not json");

        // Next load sees a clean slate
        assert_eq!(store.load().unwrap(), None);
        store.save(&Snapshot::default()).unwrap();
        assert_eq!(store.load().unwrap(), Some(Snapshot::default()));
    }

    #[test]
    fn test_corrupt_file_stays_put_when_it_cannot_be_moved() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        fs::write(store.path(), b"{ not json").unwrap();
        // A non-empty directory in the way makes the rename fail
        fs::create_dir(store.corrupt_path()).unwrap();
        fs::write(store.corrupt_path().join("keep"), b"x").unwrap();

        assert!(matches!(store.load(), Err(PersistenceError::Io(_))));
        assert_eq!(fs::read(store.path()).unwrap(), b"{ not json");
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let mut first = Snapshot::default();
        first.account.balance = 1;
        store.save(&first).unwrap();
        let mut second = Snapshot::default();
        second.account.balance = 2;
        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap().unwrap().account.balance, 2);
    }
}
