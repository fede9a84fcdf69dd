// Idempotency guards shared by the installers.
//
// Each installer checks "is this already done?" before doing expensive or
// destructive work. For shared, user-editable files such as `~/.zshrc` the
// check is a guard marker: a unique line (e.g. `# BEGIN: pyenv`) that is
// appended together with its block. If the marker is present, the block is
// never written again.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use crate::libs::run_log::RunLog;
use crate::log_debug;

/// What `append_block_once` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    AlreadyPresent,
    Appended,
    /// Simulate-only mode: the block is missing and would have been appended.
    WouldAppend,
}

/// Whether `path` contains `needle`, compared on raw bytes so files that are
/// not valid UTF-8 still match. A missing file contains nothing; any other
/// read error is returned.
pub fn file_contains(path: &Path, needle: &str) -> io::Result<bool> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log_debug!("[Guards] {} does not exist yet", path.display());
            return Ok(false);
        }
        Err(e) => return Err(e),
    };
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return Ok(true);
    }
    Ok(bytes.windows(needle.len()).any(|window| window == needle))
}

/// Appends `block` to `path` unless `marker` is already in the file.
///
/// The file is created if missing. The block is written as
/// `"\n" + block + "\n"` so it always starts on a fresh line.
pub fn append_block_once(
    path: &Path,
    marker: &str,
    block: &str,
    dry_run: bool,
    log: &RunLog,
) -> io::Result<BlockOutcome> {
    if file_contains(path, marker)? {
        log.info("zshrc", &format!("block already present, skipping: {marker}"));
        return Ok(BlockOutcome::AlreadyPresent);
    }
    if dry_run {
        log.info("zshrc", &format!("DRY-RUN: would append block: {marker}"));
        return Ok(BlockOutcome::WouldAppend);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    write!(file, "\n{block}\n")?;
    log.info("zshrc", &format!("appended block: {marker}"));
    Ok(BlockOutcome::Appended)
}
