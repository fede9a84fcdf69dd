//! # Run State File Schema (`state.json`)
//!
//! Persistent record of which tools finished successfully, so a re-run after a
//! partial failure (or after the VPN switch) resumes where the last run stopped.
//!
//! ## File Location
//!
//! - `~/.chs-onboard/state.json`
//! - `$CHS_ONBOARD_DIR/state.json` when the environment variable is set
//!
//! ## Lifecycle
//!
//! An absent file means "nothing completed yet". The file is created by the
//! first successful install, rewritten after every later one, and never
//! deleted automatically (`--reset-state` empties it).
//!
//! ## Example
//! ```json
//! {
//!   "completed_tools": {
//!     "homebrew": "2026-02-11T09:14:03Z",
//!     "xcode": "2026-02-11T09:02:41Z"
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schemas::tools::ToolId;

/// The complete structure of `state.json`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct RunState {
    /// Tool key → RFC 3339 UTC completion timestamp.
    ///
    /// A `BTreeMap` keeps the file diff-friendly. Keys are plain strings
    /// rather than `ToolId` so a state file written by a build with a
    /// different catalog still loads.
    #[serde(default)]
    pub completed_tools: BTreeMap<String, String>,
}

impl RunState {
    #[cfg(test)]
    pub fn is_completed(&self, tool: ToolId) -> bool {
        self.completed_tools.contains_key(tool.as_str())
    }

    pub fn completed_at(&self, tool: ToolId) -> Option<&str> {
        self.completed_tools.get(tool.as_str()).map(String::as_str)
    }

    /// Records `tool` as completed at `timestamp`, replacing any earlier entry.
    pub fn mark_completed(&mut self, tool: ToolId, timestamp: String) {
        self.completed_tools.insert(tool.as_str().to_string(), timestamp);
    }
}
