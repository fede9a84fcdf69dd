//! # Structured Run Log Record (`run.log`)
//!
//! `run.log` is a JSON-lines file: one `LogRecord` per line, appended and
//! never rewritten. Example line:
//!
//! ```json
//! {"ts":"2026-02-11T09:14:03Z","level":"INFO","phase":"phase1","step":"homebrew","msg":"command ok","fields":{"cmd":"/opt/homebrew/bin/brew install jq"}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat key/value context attached to a record.
pub type Fields = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub ts: String,
    pub level: Level,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phase: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub step: String,
    pub msg: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: Fields,
}

/// Builds a `Fields` map from borrowed pairs.
pub fn fields<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect()
}
