// Resolution of the per-user application directory and the files in it.

use std::env;
use std::path::PathBuf;

use crate::libs::utilities::path_helpers::expand_path;
use crate::log_debug;

/// Environment variable overriding the application directory.
pub const APP_DIR_ENV: &str = "CHS_ONBOARD_DIR";

const APP_DIR_NAME: &str = ".chs-onboard";

/// Locations of everything the onboarding run persists.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    /// `~/.chs-onboard` unless overridden.
    pub dir: PathBuf,
    pub state_file: PathBuf,
    pub log_file: PathBuf,
    pub config_file: PathBuf,
}

impl AppPaths {
    /// Builds the path set rooted at `dir`; `config_override` replaces the
    /// default `dir/config.yaml`.
    pub fn rooted_at(dir: PathBuf, config_override: Option<&str>) -> Self {
        let config_file = config_override
            .map(expand_path)
            .unwrap_or_else(|| dir.join("config.yaml"));
        Self {
            state_file: dir.join("state.json"),
            log_file: dir.join("run.log"),
            config_file,
            dir,
        }
    }
}

/// Determines where state, log and config live.
///
/// Order: `$CHS_ONBOARD_DIR`, then `<home>/.chs-onboard`. Returns `None`
/// when neither the variable nor a home directory is available.
pub fn resolve_paths(config_override: Option<&str>) -> Option<AppPaths> {
    let dir = match env::var(APP_DIR_ENV) {
        Ok(custom) if !custom.trim().is_empty() => expand_path(custom.trim()),
        _ => dirs::home_dir()?.join(APP_DIR_NAME),
    };
    let paths = AppPaths::rooted_at(dir, config_override);
    log_debug!("[Paths] Resolved application paths: {:?}", paths);
    Some(paths)
}
