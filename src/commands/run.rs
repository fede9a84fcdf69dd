// This file contains the primary logic of an onboarding run.
// It validates the request, sets up the run context (config, run log, state,
// sudo keepalive), runs preflight, and then drives the three phases:
//
//   phase1  public-network tools (VPN off)
//   phase2  network switch: operator connects the VPN, the gate waits for it
//   phase3  private-network tools (VPN on)
//
// Every failure on the way becomes a single `Fatal` value. `run` turns it
// into a `FATAL:` ERROR record and exit status 1.

use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use colored::Colorize;

use crate::cli::args::Cli;
use crate::installers::{Registry, homebrew, pyenv, shellrc};
use crate::libs::config_loading::load_config;
use crate::libs::context::RunContext;
use crate::libs::keepalive::{self, KeepaliveHandle};
use crate::libs::network_gate::{CancelToken, EndpointProbe, NetworkGate, TcpProbe};
use crate::libs::paths::resolve_paths;
use crate::libs::phase_runner::{ToolInstaller, run_phase};
use crate::libs::phases::classify;
use crate::libs::preflight::{present_ssh_key, recheck_public_internet, run_preflight};
use crate::libs::prompts::DialoguerPrompter;
use crate::libs::resolver::{Catalog, resolve, validate_acyclic};
use crate::libs::run_log::RunLog;
use crate::libs::selection::{parse_only, prompt_selection};
use crate::libs::state_management::StateStore;
use crate::libs::utilities::exec::{CommandRunner, Executor, SystemRunner, ToolEnv};
use crate::schemas::log_record::fields;
use crate::schemas::onboard_config::OnboardConfig;
use crate::schemas::tools::ToolId;
use crate::{log_debug, log_error, log_info};

const BANNER: &str = r"
  ██████╗██╗  ██╗███████╗      ██████╗ ███╗   ██╗██████╗  ██████╗  █████╗ ██████╗ ██████╗
 ██╔════╝██║  ██║██╔════╝     ██╔═══██╗████╗  ██║██╔══██╗██╔═══██╗██╔══██╗██╔══██╗██╔══██╗
 ██║     ███████║███████╗     ██║   ██║██╔██╗ ██║██████╔╝██║   ██║███████║██████╔╝██║  ██║
 ██║     ██╔══██║╚════██║     ██║   ██║██║╚██╗██║██╔══██╗██║   ██║██╔══██║██╔══██╗██║  ██║
 ╚██████╗██║  ██║███████║     ╚██████╔╝██║ ╚████║██████╔╝╚██████╔╝██║  ██║██║  ██║██████╔╝
  ╚═════╝╚═╝  ╚═╝╚══════╝      ╚═════╝ ╚═╝  ╚═══╝╚═════╝  ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚═════╝
                                                       CHS New Hire Onboarding Tool";

const VPN_MESSAGE: &str = "Phase 1 is complete. Connect to the VPN now; installation continues \
automatically once the internal network is reachable.";

/// A failure that ends the run. `step` names where it happened.
#[derive(Debug)]
pub struct Fatal {
    pub step: &'static str,
    pub error: anyhow::Error,
}

impl Fatal {
    fn new(step: &'static str, error: impl Into<anyhow::Error>) -> Self {
        Self {
            step,
            error: error.into(),
        }
    }
}

/// Helper to tag any error with the pipeline step it ended.
trait FatalAt<T> {
    fn fatal_at(self, step: &'static str) -> Result<T, Fatal>;
}

impl<T, E: Into<anyhow::Error>> FatalAt<T> for Result<T, E> {
    fn fatal_at(self, step: &'static str) -> Result<T, Fatal> {
        self.map_err(|e| Fatal::new(step, e))
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NothingSelected,
    PublicOnly,
    Complete,
}

/// The parts of the command line the pipeline itself consumes.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Pre-validated `--only` tools; `None` means interactive selection.
    pub only: Option<Vec<ToolId>>,
    pub gnoc: bool,
    pub guid: Option<String>,
}

/// Entry point for an onboarding run (everything except `--list`).
pub fn run(cli: Cli) -> ExitCode {
    if let Err(cycle) = validate_acyclic(&Catalog) {
        log_error!("internal defect: {}", cycle);
        return ExitCode::FAILURE;
    }

    // `--only` is checked before anything touches the machine.
    let only = match cli.only.as_deref() {
        Some(raw) => {
            let parsed = parse_only(raw);
            for unknown in &parsed.unknown {
                eprintln!("  {} unknown tool: {:?} (use --list)", "[!]".yellow(), unknown);
            }
            if parsed.tools.is_empty() {
                eprintln!("No valid tool IDs provided. Use --list to see available tools.");
                return ExitCode::FAILURE;
            }
            Some(parsed.tools)
        }
        None => None,
    };

    let Some(paths) = resolve_paths(cli.config.as_deref()) else {
        log_error!("Could not determine the home directory. Set $HOME or $CHS_ONBOARD_DIR.");
        return ExitCode::FAILURE;
    };
    let config = match load_config(&paths.config_file) {
        Ok(config) => config,
        Err(e) => {
            log_error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let log = match RunLog::open(&paths.log_file) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            log_error!("FATAL: failed to open run log {}: {}", paths.log_file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("{BANNER}");
    if cli.dry_run {
        println!("\n{}", "[DRY-RUN] No system changes will be made.".bright_yellow());
    }

    let request = RunRequest {
        only,
        gnoc: cli.gnoc,
        guid: cli.guid.clone(),
    };
    let result = setup_and_run(&cli, &request, config, &paths.state_file, Arc::clone(&log));

    match result {
        Ok(Outcome::NothingSelected) => {
            println!("\nNo tools selected. Exiting.");
            ExitCode::SUCCESS
        }
        Ok(Outcome::PublicOnly) => {
            println!("\n{} Done. No Phase 3 tools selected.", "✓".green());
            log.info("done", "completed successfully");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Complete) => {
            println!(
                "\n{} chs-onboard complete. Open a new terminal or run: source ~/.zshrc",
                "✓".green()
            );
            log.info("done", "completed successfully");
            ExitCode::SUCCESS
        }
        Err(fatal) => {
            log.error_with(
                fatal.step,
                &format!("FATAL: {:#}", fatal.error),
                fields(&[("error", format!("{:?}", fatal.error))]),
            );
            ExitCode::FAILURE
        }
    }
}

/// Builds the run context and runs the pipeline. The sudo keepalive is
/// stopped as soon as the pipeline returns, whatever the outcome.
fn setup_and_run(
    cli: &Cli,
    request: &RunRequest,
    config: OnboardConfig,
    state_file: &Path,
    log: Arc<RunLog>,
) -> Result<Outcome, Fatal> {
    let mut state = StateStore::load(state_file).fatal_at("state")?;
    if cli.reset_state {
        if cli.dry_run {
            log.info("state", "DRY-RUN: would reset run state");
        } else {
            state.reset().fatal_at("state")?;
            log.info("state", "run state reset");
        }
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow!("could not determine the home directory"))
        .fatal_at("setup")?;
    let user = env::var("USER").unwrap_or_default();
    let logname = env::var("LOGNAME").unwrap_or_else(|_| user.clone());
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let exec = Executor::new(
        Arc::clone(&runner),
        Arc::clone(&log),
        cli.dry_run,
        ToolEnv::new(&home, &user, &logname),
    );
    log_debug!("[Run] home={} user={}", home.display(), user);

    let keepalive_interval = config.sudo_keepalive_interval();
    let mut ctx = RunContext {
        dry_run: cli.dry_run,
        force: cli.force,
        rename_account: cli.rename_account,
        home,
        user,
        config,
        log: Arc::clone(&log),
        exec,
        prompter: Box::new(DialoguerPrompter::default()),
        identity: None,
        ssh_public_key: None,
    };

    let keepalive: Option<KeepaliveHandle> = if cli.dry_run {
        log.info("sudo", "DRY-RUN: skipping sudo credential caching");
        None
    } else {
        keepalive::cache_credentials(runner.as_ref(), &log)
            .context("sudo auth failed")
            .fatal_at("sudo")?;
        Some(keepalive::spawn(runner, Arc::clone(&log), keepalive_interval))
    };

    let outcome = pipeline(request, &mut ctx, &mut state, &Registry, TcpProbe);
    if let Some(handle) = keepalive {
        handle.stop();
    }
    outcome
}

/// Preflight, selection and the three phases.
pub fn pipeline<P: EndpointProbe>(
    request: &RunRequest,
    ctx: &mut RunContext,
    state: &mut StateStore,
    installer: &dyn ToolInstaller,
    probe: P,
) -> Result<Outcome, Fatal> {
    run_preflight(ctx, request.guid.as_deref()).fatal_at("preflight")?;
    shellrc::write_base_blocks(ctx).fatal_at("zshrc")?;
    shellrc::configure_sleep_aliases(ctx).fatal_at("sleep_alias")?;

    let requested = match &request.only {
        Some(tools) => tools.clone(),
        None => prompt_selection(ctx.prompter.as_mut(), request.gnoc).fatal_at("tool_select")?,
    };
    if requested.is_empty() {
        return Ok(Outcome::NothingSelected);
    }
    let plan = resolve(&Catalog, &requested);
    let phases = classify(&plan);
    ctx.log.info_with(
        "plan",
        "resolved install plan",
        fields(&[
            ("public", join(&phases.public)),
            ("private", join(&phases.private)),
        ]),
    );

    ctx.log.set_phase("phase1");
    println!("\n{}", "── Phase 1: Public Internet (VPN OFF) ────────────────────────".bold());
    run_phase(&phases.public, ctx, installer, state).fatal_at("phase1")?;

    if ctx.dry_run {
        ctx.log
            .info("pyenv_global", "DRY-RUN: would set pyenv global 3.13.2 ncpcli");
    } else if let Err(e) = pyenv::set_global(ctx) {
        ctx.log.warn_with(
            "pyenv_global",
            "pyenv global set failed",
            fields(&[("error", e.to_string())]),
        );
    }

    if phases.contains(ToolId::GnocHelper) {
        println!("\n  [→] Ensuring sshpass is installed (required for gnoc-helper)...");
        if ctx.dry_run {
            ctx.log.info("sshpass", "DRY-RUN: would install/verify sshpass");
        } else {
            homebrew::ensure_sshpass(ctx).fatal_at("sshpass")?;
        }
    }

    if phases.private.is_empty() {
        return Ok(Outcome::PublicOnly);
    }

    ctx.log.set_phase("phase2");
    println!("\n{}", "── Phase 2: Connect to VPN ───────────────────────────────────".bold());
    if ctx.dry_run {
        ctx.log.info(
            "vpn_wait",
            "DRY-RUN: would ask to connect the VPN and poll internal hosts",
        );
    } else {
        // The gate below is the real check; a broken dialog only loses the hint.
        if let Err(e) = ctx.prompter.alert("Connect to VPN", VPN_MESSAGE) {
            ctx.log.warn_with(
                "vpn_prompt",
                "VPN prompt could not be shown; waiting for the private network anyway",
                fields(&[("error", e.to_string())]),
            );
        }
        let gate = NetworkGate::new(
            ctx.config.private_endpoints.clone(),
            ctx.config.vpn_poll_interval(),
            ctx.config.vpn_probe_timeout(),
            probe,
        );
        gate.wait(&CancelToken::new(), &ctx.log).fatal_at("vpn_wait")?;
        println!("  [{}] VPN confirmed", "✓".green());
    }
    present_ssh_key(ctx).fatal_at("ssh_key")?;
    recheck_public_internet(ctx);

    ctx.log.set_phase("phase3");
    println!("\n{}", "── Phase 3: Internal Tools (VPN ON) ──────────────────────────".bold());
    run_phase(&phases.private, ctx, installer, state).fatal_at("phase3")?;

    log_info!("All {} planned tools processed.", plan.len());
    Ok(Outcome::Complete)
}

fn join(tools: &[ToolId]) -> String {
    tools.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(",")
}
