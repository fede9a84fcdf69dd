// Xcode Command Line Tools.
//
// `xcode-select --install` only opens the system installer dialog and
// returns immediately, so the operator has to confirm when the install has
// actually finished.

use std::path::Path;

use crate::libs::context::RunContext;
use crate::libs::phase_runner::InstallError;
use crate::libs::utilities::exec::CommandSpec;
use crate::libs::utilities::path_helpers::path_exists;

const COMMAND_LINE_TOOLS: &str = "/Library/Developer/CommandLineTools";

pub fn install(ctx: &mut RunContext) -> Result<(), InstallError> {
    install_with(ctx, Path::new(COMMAND_LINE_TOOLS))
}

/// `cli_tools` is the directory whose presence means the tools are installed.
pub fn install_with(ctx: &mut RunContext, cli_tools: &Path) -> Result<(), InstallError> {
    if path_exists(cli_tools) {
        ctx.log.info("xcode", "Xcode CLI tools already installed");
        return Ok(());
    }

    println!("  [→] Installing Xcode Command Line Tools (a system dialog will appear)...");
    // A non-zero exit here usually means "already requested"; the operator
    // confirmation below is what counts.
    if let Err(e) = ctx
        .exec
        .interactive("xcode", CommandSpec::new("xcode-select").arg("--install"))
    {
        ctx.log.warn("xcode", &format!("xcode-select reported: {e}"));
    }

    let confirmed = ctx.prompter.confirm(
        "Xcode CLI Tools",
        "Confirm once the Xcode Command Line Tools installation is complete.",
    )?;
    if !confirmed {
        return Err(InstallError::NotConfirmed("xcode CLI tools installation".to_string()));
    }
    Ok(())
}
