// This module is responsible for the persistent Run State (`state.json`).
// It loads the record of completed tools at startup, answers "was this tool
// already installed by an earlier run?", and writes the file back after
// every single successful install so an abort never loses finished work.
//
// Key functionalities include:
// - Treating an absent state file as "nothing completed yet".
// - Rejecting an unreadable or malformed file instead of overwriting it.
// - Creating the parent directory on first save.
// - Emptying the record on `--reset-state`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::libs::utilities::timestamps::current_timestamp;
use crate::log_debug;
use crate::schemas::state_file::RunState;
use crate::schemas::tools::ToolId;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid state file {path}: {source}. Fix or delete it to start fresh")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("failed to write state file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to serialize run state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The loaded `RunState` together with the file it persists to.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: RunState,
}

impl StateStore {
    /// Loads `path`, or starts empty if it does not exist. Nothing is written.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let state = if path.exists() {
            log_debug!("[State] Loading run state from {}", path.display());
            let contents = fs::read_to_string(path).map_err(|source| StateError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&contents).map_err(|source| StateError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            log_debug!("[State] No state file at {}. Starting fresh.", path.display());
            RunState::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[cfg(test)]
    pub fn is_completed(&self, tool: ToolId) -> bool {
        self.state.is_completed(tool)
    }

    pub fn completed_at(&self, tool: ToolId) -> Option<&str> {
        self.state.completed_at(tool)
    }

    /// Records `tool` as completed now and persists immediately.
    pub fn mark_completed(&mut self, tool: ToolId) -> Result<(), StateError> {
        self.state.mark_completed(tool, current_timestamp());
        self.save()
    }

    /// Forgets every completion and persists the empty record.
    pub fn reset(&mut self) -> Result<(), StateError> {
        self.state = RunState::default();
        self.save()
    }

    pub fn save(&self) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StateError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        let serialized = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, serialized).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })?;
        log_debug!("[State] Run state saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_is_empty_and_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".chs-onboard").join("state.json");
        let store = StateStore::load(&path).unwrap();
        assert!(store.state().completed_tools.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn mark_completed_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".chs-onboard").join("state.json");
        let mut store = StateStore::load(&path).unwrap();
        store.mark_completed(ToolId::Xcode).unwrap();
        assert!(path.exists());

        let reloaded = StateStore::load(&path).unwrap();
        assert!(reloaded.is_completed(ToolId::Xcode));
        let ts = reloaded.completed_at(ToolId::Xcode).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn reset_clears_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = StateStore::load(&path).unwrap();
        store.mark_completed(ToolId::Homebrew).unwrap();
        store.reset().unwrap();
        let reloaded = StateStore::load(&path).unwrap();
        assert!(!reloaded.is_completed(ToolId::Homebrew));
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(StateStore::load(&path), Err(StateError::Parse { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn written_file_uses_completed_tools_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = StateStore::load(&path).unwrap();
        store.mark_completed(ToolId::Iterm2).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["completed_tools"]["iterm2"].is_string());
    }
}
