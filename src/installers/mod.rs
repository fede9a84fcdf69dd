//! # Installer Registry
//!
//! One idempotent installation routine per catalog entry. The [`Registry`]
//! is the production [`ToolInstaller`] handed to the phase engine: it logs
//! the tool being installed, short-circuits in simulate-only mode, and
//! dispatches to the routine for that tool.
//!
//! Every routine checks a guard first (an expected file, directory or
//! version marker) and returns early when the work is already done. Any
//! failed sub-step is a hard failure and propagates to the engine.

pub mod homebrew;
pub mod internal_repos;
pub mod iterm2;
pub mod pip;
pub mod pyenv;
pub mod shellrc;
pub mod xcode;

use std::path::Path;

use crate::libs::context::RunContext;
use crate::libs::phase_runner::{InstallError, ToolInstaller};
use crate::libs::utilities::path_helpers::path_exists;
use crate::schemas::log_record::fields;
use crate::schemas::tools::ToolId;

#[derive(Debug, Default, Clone, Copy)]
pub struct Registry;

impl ToolInstaller for Registry {
    fn install(&self, tool: ToolId, ctx: &mut RunContext) -> Result<(), InstallError> {
        let step = tool.as_str();
        ctx.log.info(step, &format!("installing: {step}"));
        if ctx.dry_run {
            ctx.log.info(step, &format!("DRY-RUN: would install {step}"));
            return Ok(());
        }

        let result = match tool {
            ToolId::Iterm2 => iterm2::install(ctx),
            ToolId::Xcode => xcode::install(ctx),
            ToolId::Homebrew => homebrew::install(ctx),
            ToolId::Pyenv => pyenv::install_shell_setup(ctx),
            ToolId::Python313 => pyenv::install_python(ctx, pyenv::PYTHON_313),
            ToolId::Python396 => pyenv::install_python(ctx, pyenv::PYTHON_396),
            ToolId::PyenvVenvNcpcli => pyenv::install_virtualenv(ctx, pyenv::NCPCLI_VENV, pyenv::PYTHON_396),
            ToolId::Allproxy => internal_repos::install_allproxy(ctx),
            ToolId::SpartaPki => internal_repos::install_sparta_pki(ctx),
            ToolId::HopsCli => pip::install_hops_cli(ctx),
            ToolId::GnocHelper => internal_repos::install_gnoc_helper(ctx),
            ToolId::Stencil => internal_repos::install_stencil(ctx),
            ToolId::Silencer => internal_repos::install_silencer(ctx),
            ToolId::Ncpcli => pip::install_ncpcli(ctx),
            ToolId::JitPass => internal_repos::install_jit_pass(ctx),
        };

        match &result {
            Ok(()) => ctx.log.info(step, "done"),
            Err(e) => ctx.log.error_with(step, "failed", fields(&[("error", e.to_string())])),
        }
        result
    }
}

/// Post-install check: the artifact an install was supposed to produce.
pub(crate) fn verify_artifact(path: &Path) -> Result<(), InstallError> {
    if path_exists(path) {
        Ok(())
    } else {
        Err(InstallError::MissingArtifact(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::context::tests::context;
    use crate::libs::utilities::exec::tests::FakeRunner;
    use std::sync::Arc;

    #[test]
    fn dry_run_dispatch_has_no_side_effects() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mut ctx = context(home.path(), Arc::clone(&runner), true, vec![]);
        for tool in ToolId::ALL {
            Registry.install(tool, &mut ctx).unwrap();
        }
        assert!(runner.commands().is_empty());
        assert_eq!(std::fs::read_dir(home.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_artifact_is_reported_with_its_path() {
        let err = verify_artifact(Path::new("/nonexistent/chs/.pyenv/versions/3.13.2")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "install finished but /nonexistent/chs/.pyenv/versions/3.13.2 is missing"
        );
    }
}
