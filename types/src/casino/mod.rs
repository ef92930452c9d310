//! Casino domain types.
//!
//! Defines round/wager/account/snapshot state and constants used by the execution layer
//! and the table host.

mod account;
mod bet;
mod constants;
mod round;
mod snapshot;

pub use account::*;
pub use bet::*;
pub use constants::*;
pub use round::*;
pub use snapshot::*;
