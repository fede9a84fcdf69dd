use clap::Parser;

/// Defines the command-line interface (CLI) for `chs-onboard`.
/// Without `--list` or `--only`, the tools to install are picked interactively.
#[derive(Debug, Parser)]
#[command(name = "chs-onboard", version)]
#[command(about = "CHS new hire workstation onboarding", long_about = None)]
pub struct Cli {
    /// List available tool IDs and exit.
    #[arg(long)]
    pub list: bool,

    /// Comma-separated tool IDs to install, plus their prerequisites (see --list).
    #[arg(long, value_name = "IDS")]
    pub only: Option<String>,

    /// Pre-select the GNOC tool set in interactive selection.
    #[arg(long)]
    pub gnoc: bool,

    /// Print intended actions without making system changes.
    #[arg(long)]
    pub dry_run: bool,

    /// Reinstall tools already recorded as completed.
    #[arg(long)]
    pub force: bool,

    /// Forget every recorded completion before starting.
    #[arg(long)]
    pub reset_state: bool,

    /// Oracle GUID; skips the identity prompt.
    #[arg(long, env = "CHS_GUID", value_name = "GUID")]
    pub guid: Option<String>,

    /// Offer to rename the local account and computer to the GUID (asks first).
    #[arg(long)]
    pub rename_account: bool,

    /// Path to a config.yaml overriding endpoints and intervals.
    #[arg(long, env = "CHS_ONBOARD_CONFIG", value_name = "PATH")]
    pub config: Option<String>,

    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long)]
    pub debug: bool,
}
