// The run context: everything the preflight, the phase engine and the
// installers share during one onboarding run. It is built once in
// `commands::run` and passed down by reference; nothing here is global.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::libs::prompts::Prompter;
use crate::libs::run_log::RunLog;
use crate::libs::utilities::exec::Executor;
use crate::libs::utilities::guards::{BlockOutcome, append_block_once};
use crate::schemas::onboard_config::OnboardConfig;

pub struct RunContext {
    pub dry_run: bool,
    /// Reinstall tools already recorded as completed.
    pub force: bool,
    /// Allow the gated account-rename step in preflight.
    pub rename_account: bool,
    pub home: PathBuf,
    /// Login name of the operator's local account.
    pub user: String,
    pub config: OnboardConfig,
    pub log: Arc<RunLog>,
    pub exec: Executor,
    pub prompter: Box<dyn Prompter>,
    /// Operator GUID, from `--guid` or collected in preflight.
    pub identity: Option<String>,
    /// Public SSH key read (or generated) in preflight, shown after the
    /// network switch.
    pub ssh_public_key: Option<String>,
}

impl RunContext {
    pub fn home_path(&self, relative: &str) -> PathBuf {
        self.home.join(relative)
    }

    pub fn zshrc(&self) -> PathBuf {
        self.home_path(".zshrc")
    }

    pub fn pyenv_root(&self) -> PathBuf {
        self.home_path(".pyenv")
    }

    pub fn pyenv_bin(&self) -> PathBuf {
        self.pyenv_root().join("bin").join("pyenv")
    }

    /// `~/.pyenv/versions/<name>`: an interpreter version or a virtualenv.
    pub fn pyenv_version_dir(&self, name: &str) -> PathBuf {
        self.pyenv_root().join("versions").join(name)
    }

    /// `pip` of an interpreter version or virtualenv.
    pub fn pip(&self, name: &str) -> PathBuf {
        self.pyenv_version_dir(name).join("bin").join("pip")
    }

    pub fn identity(&self) -> &str {
        self.identity.as_deref().unwrap_or_default()
    }

    /// Guard-marked append to `~/.zshrc`, honoring simulate-only mode.
    pub fn append_zshrc_block(&self, marker: &str, block: &str) -> std::io::Result<BlockOutcome> {
        append_block_once(&self.zshrc(), marker, block, self.dry_run, &self.log)
    }
}

/// Lossy `&str` view of a path for command arguments.
pub fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
