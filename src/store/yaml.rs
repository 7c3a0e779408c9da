//! YAML file state store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::StateStore;
use crate::state::ExperimentState;
use crate::{Error, Result};

/// Directory under the data dir holding the scaling experiment files.
pub const SCALING_DIR: &str = "scaling";

/// File name of the persisted samples.
pub const STATE_FILE: &str = "scaling.yaml";

/// [`StateStore`] backed by a YAML document on disk.
///
/// Saves go to a temporary sibling file that is synced and then renamed over
/// the target, so the file always holds a complete document. The containing
/// directory is synced after the rename; a failed save leaves no temp file.
#[derive(Debug, Clone)]
pub struct YamlFileStore {
    path: PathBuf,
}

impl YamlFileStore {
    /// Store at an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/scaling/scaling.yaml`.
    #[must_use]
    pub fn in_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(SCALING_DIR).join(STATE_FILE))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl StateStore for YamlFileStore {
    fn load(&self) -> Result<ExperimentState> {
        if !self.path.is_file() {
            debug!(path = %self.path.display(), "no saved state, starting empty");
            return Ok(ExperimentState::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(ExperimentState::new());
        }
        serde_yaml::from_str(&text).map_err(|e| {
            Error::Storage(format!("cannot parse {}: {e}", self.path.display()))
        })
    }

    fn save(&mut self, state: &ExperimentState) -> Result<()> {
        let dir = self.dir();
        fs::create_dir_all(dir)?;
        let text = serde_yaml::to_string(state)?;

        // Removed on drop if anything below fails.
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{STATE_FILE}."))
            .tempfile_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        // Make the rename itself durable.
        if let Ok(handle) = fs::File::open(dir) {
            if let Err(e) = handle.sync_all() {
                debug!(dir = %dir.display(), error = %e, "directory sync skipped");
            }
        }
        debug!(path = %self.path.display(), bytes = text.len(), "state saved");
        Ok(())
    }
}
