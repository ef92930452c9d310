//! Durable storage contract for table state.

use roulette_types::casino::Snapshot;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("storage i/o failed: {0}")]
    Io(String),
    #[error("stored state is corrupt: {0}")]
    Corrupt(String),
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Loads and saves the table [`Snapshot`].
///
/// `load` returns `Ok(None)` when nothing has been saved yet. `save` must be durable once it
/// returns `Ok`.
pub trait PersistenceGateway {
    fn load(&mut self) -> Result<Option<Snapshot>, PersistenceError>;
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

impl<T: PersistenceGateway + ?Sized> PersistenceGateway for Box<T> {
    fn load(&mut self) -> Result<Option<Snapshot>, PersistenceError> {
        (**self).load()
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        (**self).save(snapshot)
    }
}
