//! # Homebrew
//!
//! Installs Homebrew itself (official install script, non-interactive), the
//! formulae the rest of the toolchain builds on, the OpenSC smart-card cask
//! and its PKCS#11 module link. Also provides `ensure_sshpass`, which the run
//! pipeline calls after the public phase when `gnoc_helper` is planned.
//!
//! Every step is re-runnable: `brew install` of an installed formula is a
//! no-op, and the link is only created when missing.

use std::path::{Path, PathBuf};

use crate::libs::context::{RunContext, arg};
use crate::libs::phase_runner::InstallError;
use crate::libs::utilities::exec::CommandSpec;
use crate::libs::utilities::path_helpers::path_exists;

pub const BREW: &str = "/opt/homebrew/bin/brew";

const INSTALL_SCRIPT: &str =
    "NONINTERACTIVE=1 curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh | bash";

/// Formulae every onboarded machine needs. A failure here is fatal.
const FORMULAE: [&str; 5] = ["openssl", "yubico-piv-tool", "jq", "pyenv", "pyenv-virtualenv"];

const SSHPASS_TAP_FORMULA: &str = "hudochenkov/sshpass/sshpass";

/// Where the Homebrew installer looks for and puts things.
#[derive(Debug, Clone)]
pub struct BrewLayout {
    pub brew: PathBuf,
    /// PKCS#11 module shipped by the OpenSC cask.
    pub opensc_module: PathBuf,
    /// Hard link `ssh-add -s` expects.
    pub opensc_link: PathBuf,
    /// Any of these existing means `sshpass` is installed.
    pub sshpass: Vec<PathBuf>,
}

impl BrewLayout {
    /// Apple Silicon Homebrew prefix and the system library dir.
    pub fn system() -> Self {
        Self {
            brew: PathBuf::from(BREW),
            opensc_module: PathBuf::from("/Library/OpenSC/lib/opensc-pkcs11.so"),
            opensc_link: PathBuf::from("/usr/local/lib/opensc-pkcs11.so"),
            sshpass: vec![
                PathBuf::from("/opt/homebrew/bin/sshpass"),
                PathBuf::from("/usr/local/bin/sshpass"),
            ],
        }
    }

    fn brew_cmd(&self) -> CommandSpec {
        CommandSpec::new(arg(&self.brew))
    }

    fn sshpass_installed(&self) -> bool {
        self.sshpass.iter().any(|p| path_exists(p))
    }
}

pub fn install(ctx: &mut RunContext) -> Result<(), InstallError> {
    install_with(ctx, &BrewLayout::system())
}

pub fn install_with(ctx: &RunContext, layout: &BrewLayout) -> Result<(), InstallError> {
    if path_exists(&layout.brew) {
        ctx.log.info("homebrew", "Homebrew already installed");
    } else {
        println!("  [→] Installing Homebrew...");
        ctx.exec
            .run("homebrew", CommandSpec::new("/bin/bash").args(["-c", INSTALL_SCRIPT]))?;
    }
    ensure_packages(ctx, layout)?;
    ensure_opensc_link(ctx, layout)
}

fn ensure_packages(ctx: &RunContext, layout: &BrewLayout) -> Result<(), InstallError> {
    for formula in FORMULAE {
        ctx.exec
            .run("homebrew", layout.brew_cmd().args(["install", formula]))?;
    }
    if ctx
        .exec
        .run("homebrew", layout.brew_cmd().args(["install", "--cask", "opensc"]))
        .is_err()
    {
        ctx.log
            .warn("homebrew", "opensc cask install failed (may already be installed)");
    }
    Ok(())
}

/// Hard-links the OpenSC PKCS#11 module to where `ssh-add -s` expects it.
fn ensure_opensc_link(ctx: &RunContext, layout: &BrewLayout) -> Result<(), InstallError> {
    if !path_exists(&layout.opensc_module) {
        ctx.log
            .warn("opensc", "source opensc-pkcs11.so not found, skipping link");
        return Ok(());
    }
    if path_exists(&layout.opensc_link) {
        ctx.log.info("opensc", "link already exists");
        return Ok(());
    }
    let link_dir = layout.opensc_link.parent().unwrap_or(Path::new("/"));
    ctx.exec
        .sudo("opensc", CommandSpec::new("mkdir").args(["-pv".to_string(), arg(link_dir)]))?;
    ctx.exec.sudo(
        "opensc",
        CommandSpec::new("ln").args(["-v".to_string(), arg(&layout.opensc_module), arg(&layout.opensc_link)]),
    )?;
    Ok(())
}

/// `sshpass` is required by gnoc-helper. Tries the tap formula first, then
/// the plain one; the binary must exist afterwards.
pub fn ensure_sshpass(ctx: &RunContext) -> Result<(), InstallError> {
    ensure_sshpass_with(ctx, &BrewLayout::system())
}

pub fn ensure_sshpass_with(ctx: &RunContext, layout: &BrewLayout) -> Result<(), InstallError> {
    if layout.sshpass_installed() {
        ctx.log.info("sshpass", "sshpass already installed");
        return Ok(());
    }
    if !path_exists(&layout.brew) {
        return Err(InstallError::Precondition(format!(
            "homebrew not found at {}; required for sshpass install",
            layout.brew.display()
        )));
    }

    if let Err(tap_err) = ctx
        .exec
        .run("sshpass", layout.brew_cmd().args(["install", SSHPASS_TAP_FORMULA]))
    {
        ctx.log.warn("sshpass", "tap formula failed, trying the plain formula");
        if let Err(fallback_err) = ctx
            .exec
            .run("sshpass", layout.brew_cmd().args(["install", "sshpass"]))
        {
            return Err(InstallError::Precondition(format!(
                "sshpass install failed: tap formula error: {tap_err}; fallback error: {fallback_err}"
            )));
        }
    }

    if !layout.sshpass_installed() {
        return Err(InstallError::Precondition(
            "sshpass install completed but binary not found".to_string(),
        ));
    }
    Ok(())
}
