// Small path helpers shared by config loading and the installers.

use std::path::{Path, PathBuf};

use crate::log_debug;

/// Resolves a path given by the user or a config file.
///
/// `~` and `$VARS` are expanded with `shellexpand`. If expansion fails (an
/// undefined variable, for example) only the tilde is expanded and the rest
/// of the path is used as written.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log_debug!("[Paths] Could not fully expand '{}': {}. Expanding '~' only.", path, e);
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}

/// `true` if anything (file, directory, symlink target) exists at `path`.
pub fn path_exists(path: &Path) -> bool {
    path.exists()
}
