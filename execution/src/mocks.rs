//! Test doubles for the table's collaborators.

use crate::outcome::{Outcome, OutcomeError, OutcomeProvider, OutcomeSource};
use crate::persistence::{PersistenceError, PersistenceGateway};
use crate::wheel::SlotLocator;
use glam::Vec3;
use roulette_types::casino::{Snapshot, MAX_NUMBER};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryInner {
    snapshot: Option<Snapshot>,
    fail_writes: bool,
    read_error: Option<PersistenceError>,
    saves: usize,
}

/// In-memory store. Clones share the same state, so a test can keep a handle after moving
/// one into the table.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    inner: Arc<Mutex<MemoryInner>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let memory = Self::default();
        memory.lock().snapshot = Some(snapshot);
        memory
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent `save` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make `load` fail with an I/O error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().read_error =
            fail.then(|| PersistenceError::Io("simulated read failure".to_string()));
    }

    /// Make `load` report the saved record as corrupt.
    pub fn set_corrupt_reads(&self, corrupt: bool) {
        self.lock().read_error =
            corrupt.then(|| PersistenceError::Corrupt("simulated bad record".to_string()));
    }

    /// Last successfully saved snapshot.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.lock().snapshot.clone()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }
}

impl PersistenceGateway for Memory {
    fn load(&mut self) -> Result<Option<Snapshot>, PersistenceError> {
        let inner = self.lock();
        if let Some(err) = &inner.read_error {
            return Err(err.clone());
        }
        Ok(inner.snapshot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(PersistenceError::Io("simulated write failure".to_string()));
        }
        inner.snapshot = Some(snapshot.clone());
        inner.saves += 1;
        Ok(())
    }
}

/// Draws numbers from a fixed script; fails once the script runs out.
#[derive(Clone, Debug, Default)]
pub struct ScriptedOutcome {
    script: VecDeque<u8>,
    pending: Option<u8>,
}

impl ScriptedOutcome {
    pub fn new(numbers: impl IntoIterator<Item = u8>) -> Self {
        Self {
            script: numbers.into_iter().collect(),
            pending: None,
        }
    }
}

impl OutcomeProvider for ScriptedOutcome {
    fn set_override(&mut self, number: u8) -> Result<(), OutcomeError> {
        if number > MAX_NUMBER {
            return Err(OutcomeError::OutOfRange { number });
        }
        self.pending = Some(number);
        Ok(())
    }

    fn draw_number(&mut self) -> Result<Outcome, OutcomeError> {
        if let Some(number) = self.pending.take() {
            return Ok(Outcome {
                number,
                source: OutcomeSource::Override,
            });
        }
        let number = self
            .script
            .pop_front()
            .ok_or_else(|| OutcomeError::Unavailable("script exhausted".to_string()))?;
        Ok(Outcome {
            number,
            source: OutcomeSource::Random,
        })
    }

    fn pending_override(&self) -> Option<u8> {
        self.pending
    }
}

/// Locator that only knows some pockets.
#[derive(Clone, Debug)]
pub struct PartialWheel<L> {
    inner: L,
    missing: Vec<u8>,
}

impl<L> PartialWheel<L> {
    pub fn new(inner: L, missing: impl IntoIterator<Item = u8>) -> Self {
        Self {
            inner,
            missing: missing.into_iter().collect(),
        }
    }
}

impl<L: SlotLocator> SlotLocator for PartialWheel<L> {
    fn slot_position(&self, number: u8, elapsed_secs: f32) -> Option<Vec3> {
        if self.missing.contains(&number) {
            return None;
        }
        self.inner.slot_position(number, elapsed_secs)
    }
}
