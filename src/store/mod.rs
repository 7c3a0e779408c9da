//! Persistence of [`ExperimentState`]
//!
//! Provides a small storage seam for the tracker with:
//! - A YAML file backend doing atomic full rewrites (`scaling.yaml`)
//! - An in-memory backend for tests
//!
//! # Example
//!
//! ```rust
//! use spark_scaling_bench::state::ExperimentState;
//! use spark_scaling_bench::store::{MemoryStateStore, StateStore};
//!
//! # fn example() -> spark_scaling_bench::Result<()> {
//! let mut store = MemoryStateStore::new();
//! assert!(store.load()?.is_empty());
//!
//! let mut state = ExperimentState::new();
//! state.entry(3).push_data_load(500);
//! store.save(&state)?;
//! assert_eq!(store.load()?, state);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod memory;
mod yaml;

pub use memory::MemoryStateStore;
pub use yaml::{YamlFileStore, SCALING_DIR, STATE_FILE};

use crate::state::ExperimentState;
use crate::Result;

/// Storage backend for the experiment state.
///
/// Every `save` replaces the whole persisted structure; a reader never
/// observes a partially written state.
pub trait StateStore {
    /// Load the persisted state.
    ///
    /// Returns an empty state if nothing has been persisted yet.
    fn load(&self) -> Result<ExperimentState>;

    /// Persist `state`, replacing whatever was stored before.
    fn save(&mut self, state: &ExperimentState) -> Result<()>;
}

impl<S: StateStore + ?Sized> StateStore for &mut S {
    fn load(&self) -> Result<ExperimentState> {
        (**self).load()
    }

    fn save(&mut self, state: &ExperimentState) -> Result<()> {
        (**self).save(state)
    }
}
