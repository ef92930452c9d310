//! Roulette table execution layer.
//!
//! This crate contains the round state machine ([`table::Table`]), the outcome selector, the
//! ball trajectory simulator and the wager bookkeeping used by the table host.
//!
//! ## Determinism requirements
//! - Do not read wall-clock time inside execution; elapsed time is passed into `tick`.
//! - Randomness comes only from injected or seeded generators.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Money invariants
//! The winning number is fixed before the ball is released and settlement resolves against that
//! number only. Every balance mutation is handed to the [`persistence::PersistenceGateway`];
//! a failed write keeps the in-memory state authoritative and is retried on later ticks.
//!
//! ## Minimal round (example)
//! ```rust,ignore
//! # #[cfg(feature = "mocks")]
//! # {
//! use roulette_execution::mocks::{Memory, ScriptedOutcome};
//! use roulette_execution::table::{Table, TableConfig};
//! use roulette_execution::wheel::{StaticWheel, WheelGeometry};
//! use roulette_types::casino::{BetLayout, SlotId};
//! use glam::Vec3;
//! use std::time::Duration;
//!
//! let mut table = Table::new(
//!     TableConfig::default(),
//!     WheelGeometry::circular(Vec3::ZERO, 2.0, 16, 0.1),
//!     ScriptedOutcome::new([17]),
//!     StaticWheel::new(Vec3::ZERO, 1.6, 0.05),
//!     Memory::new(),
//! )?;
//! table.place_bet(SlotId::from("s17"), BetLayout::Straight { number: 17 }, 100)?;
//! table.confirm()?;
//! while table.winning_number().is_some() {
//!     table.tick(Duration::from_millis(16))?;
//! }
//! # }
//! ```

pub mod casino;
pub mod events;
pub mod outcome;
pub mod persistence;
pub mod round_scheduler;
pub mod table;
pub mod trajectory;
pub mod wheel;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod idempotency_tests;

pub use events::{AccountView, TableEvent};
pub use outcome::{Outcome, OutcomeError, OutcomeProvider, OutcomeSource, RouletteOutcome};
pub use persistence::{PersistenceError, PersistenceGateway};
pub use round_scheduler::{PhaseConfig, RoundScheduler, TransitionResult};
pub use table::{Table, TableConfig, TableError};
pub use trajectory::{RollPhase, TrajectoryConfig, TrajectorySample, TrajectorySimulator};
pub use wheel::{RotatingWheel, SlotLocator, StaticWheel, WheelGeometry};
