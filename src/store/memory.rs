//! In-memory state store.
//!
//! Keeps the serialized YAML of the last save so tests can compare persisted
//! bytes, and can be told to fail upcoming saves.

use super::StateStore;
use crate::state::ExperimentState;
use crate::{Error, Result};

/// In-memory [`StateStore`] holding the last saved document.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    document: Option<String>,
    writes: usize,
    attempts: usize,
    failing_saves: usize,
    fail_on: Vec<usize>,
}

impl MemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if `state` can't be serialized.
    pub fn with_state(state: &ExperimentState) -> Result<Self> {
        Ok(Self {
            document: Some(serde_yaml::to_string(state)?),
            ..Self::default()
        })
    }

    /// The last persisted document, if any.
    #[must_use]
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Number of successful saves.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// Make the next `count` saves fail with [`Error::Storage`].
    pub fn fail_next_saves(&mut self, count: usize) {
        self.failing_saves = count;
    }

    /// Make the `n`th save call (1-based, counting failed calls) fail.
    pub fn fail_save(&mut self, n: usize) {
        self.fail_on.push(n);
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<ExperimentState> {
        match &self.document {
            Some(text) => Ok(serde_yaml::from_str(text)?),
            None => Ok(ExperimentState::new()),
        }
    }

    fn save(&mut self, state: &ExperimentState) -> Result<()> {
        self.attempts += 1;
        if self.fail_on.contains(&self.attempts) {
            return Err(Error::Storage(format!("injected failure of save #{}", self.attempts)));
        }
        if self.failing_saves > 0 {
            self.failing_saves -= 1;
            return Err(Error::Storage("injected save failure".into()));
        }
        self.document = Some(serde_yaml::to_string(state)?);
        self.writes += 1;
        Ok(())
    }
}
