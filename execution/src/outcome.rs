//! Winning number selection.
//!
//! A round's number is either an operator override (consumed by the next draw) or a uniform
//! draw over `0..=36`. Nothing here is persisted.

use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use roulette_types::casino::MAX_NUMBER;
use thiserror::Error as ThisError;
use tracing::debug;

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum OutcomeError {
    #[error("winning number {number} out of range (max 36)")]
    OutOfRange { number: u8 },
    #[error("outcome unavailable: {0}")]
    Unavailable(String),
}

/// Where a winning number came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeSource {
    Override,
    Random,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub number: u8,
    pub source: OutcomeSource,
}

/// Supplies the winning number for each spin.
pub trait OutcomeProvider {
    /// Arm a one-shot override for the next draw.
    fn set_override(&mut self, number: u8) -> Result<(), OutcomeError>;

    /// Produce the next winning number, consuming any armed override.
    fn draw_number(&mut self) -> Result<Outcome, OutcomeError>;

    /// The override the next draw would consume, if any.
    fn pending_override(&self) -> Option<u8>;
}

/// Uniform draw over the wheel with a one-shot override.
pub struct RouletteOutcome<R: RngCore = StdRng> {
    rng: R,
    pending: Option<u8>,
}

impl RouletteOutcome<StdRng> {
    /// Seeded when `seed` is given (reproducible sessions), entropy-seeded otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: RngCore> RouletteOutcome<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, pending: None }
    }
}

impl<R: RngCore> OutcomeProvider for RouletteOutcome<R> {
    fn set_override(&mut self, number: u8) -> Result<(), OutcomeError> {
        if number > MAX_NUMBER {
            return Err(OutcomeError::OutOfRange { number });
        }
        self.pending = Some(number);
        Ok(())
    }

    fn draw_number(&mut self) -> Result<Outcome, OutcomeError> {
        if let Some(number) = self.pending.take() {
            debug!(number, "using override");
            return Ok(Outcome {
                number,
                source: OutcomeSource::Override,
            });
        }
        let number = self.rng.gen_range(0..=MAX_NUMBER);
        debug!(number, "drew random number");
        Ok(Outcome {
            number,
            source: OutcomeSource::Random,
        })
    }

    fn pending_override(&self) -> Option<u8> {
        self.pending
    }
}
