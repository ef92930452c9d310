//! Durable implementations of the table's persistence gateway.

mod json;
mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::config::{StoreBackend, StoreConfig};
use anyhow::Result;
use roulette_execution::persistence::PersistenceGateway;
use tracing::info;

pub type BoxedStore = Box<dyn PersistenceGateway + Send>;

/// Open the configured backend.
pub fn open(config: &StoreConfig) -> Result<BoxedStore> {
    let store: BoxedStore = match config.backend {
        StoreBackend::Sqlite => Box::new(SqliteStore::open(&config.path)?),
        StoreBackend::Json => Box::new(JsonFileStore::open(&config.path)?),
    };
    info!(backend = ?config.backend, path = %config.path.display(), "opened table store");
    Ok(store)
}
