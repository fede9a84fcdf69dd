// pyenv-managed interpreters and the `ncpcli` virtualenv.
//
// The pyenv binaries themselves come from Homebrew; the `pyenv` tool only
// makes sure the shell is set up for them. Interpreter versions and the
// virtualenv are guarded by their directory under `~/.pyenv/versions`, and
// that directory must exist once the install command returns.

use crate::installers::shellrc::{PYENV_BLOCK, PYENV_MARKER};
use crate::installers::verify_artifact;
use crate::libs::context::{RunContext, arg};
use crate::libs::phase_runner::InstallError;
use crate::libs::utilities::exec::{CommandSpec, ExecError};
use crate::libs::utilities::path_helpers::path_exists;

pub const PYTHON_313: &str = "3.13.2";
pub const PYTHON_396: &str = "3.9.6";
pub const NCPCLI_VENV: &str = "ncpcli";

pub fn install_shell_setup(ctx: &mut RunContext) -> Result<(), InstallError> {
    ctx.append_zshrc_block(PYENV_MARKER, PYENV_BLOCK)
        .map_err(InstallError::io("append to", ctx.zshrc()))?;
    Ok(())
}

pub fn install_python(ctx: &mut RunContext, version: &str) -> Result<(), InstallError> {
    let version_dir = ctx.pyenv_version_dir(version);
    if path_exists(&version_dir) {
        ctx.log.info("pyenv", &format!("Python {version} already installed"));
        return Ok(());
    }
    ctx.exec
        .run("pyenv", CommandSpec::new(arg(&ctx.pyenv_bin())).args(["install", version]))?;
    verify_artifact(&version_dir)
}

pub fn install_virtualenv(ctx: &mut RunContext, name: &str, python: &str) -> Result<(), InstallError> {
    let venv_dir = ctx.pyenv_version_dir(name);
    if path_exists(&venv_dir) {
        ctx.log.info("pyenv", &format!("virtualenv {name} already exists"));
        return Ok(());
    }
    ctx.exec.run(
        "pyenv_venv",
        CommandSpec::new(arg(&ctx.pyenv_bin())).args(["virtualenv", python, name]),
    )?;
    verify_artifact(&venv_dir)
}

/// `pyenv global 3.13.2 ncpcli`, run once the public phase is through.
pub fn set_global(ctx: &RunContext) -> Result<(), ExecError> {
    ctx.exec.run(
        "pyenv_global",
        CommandSpec::new(arg(&ctx.pyenv_bin())).args(["global", PYTHON_313, NCPCLI_VENV]),
    )?;
    Ok(())
}
