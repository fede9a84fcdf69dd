// Loads the optional `config.yaml` into an `OnboardConfig`.
//
// A missing file is not an error: every field has a default. A file that
// exists but can't be read or parsed is rejected before the run touches
// anything, so a typo never silently falls back to production endpoints.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::schemas::onboard_config::OnboardConfig;
use crate::{log_debug, log_info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config file {path}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },
}

pub fn load_config(path: &Path) -> Result<OnboardConfig, ConfigError> {
    if !path.exists() {
        log_debug!("[Config] No config file at {}. Using defaults.", path.display());
        return Ok(OnboardConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(OnboardConfig::default());
    }
    let config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log_info!("[Config] Using configuration file: {}", path.display());
    log_debug!("[Config] Loaded configuration: {:#?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, OnboardConfig::default());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "\n").unwrap();
        assert_eq!(load_config(&path).unwrap(), OnboardConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "private_endpoints: [\"127.0.0.1:1\"]\nsudo_keepalive_secs: 30\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.private_endpoints, vec!["127.0.0.1:1".to_string()]);
        assert_eq!(config.sudo_keepalive_secs, 30);
        assert_eq!(config.vpn_poll_interval_secs, 5);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "private_endpoints: 12: [").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }
}
