//! Host runtime for a single roulette table.
//!
//! Loads [`config::Config`], opens a durable [`store`], and drives a
//! [`roulette_execution::Table`] on a tokio task through [`runner::spawn_table`].

pub mod command;
pub mod config;
pub mod runner;
pub mod store;
pub mod telemetry;

pub use config::{Config, StoreBackend, StoreConfig, WheelConfig};
pub use runner::{spawn_table, HandleError, TableHandle, TableStatus};
pub use store::{JsonFileStore, SqliteStore};
