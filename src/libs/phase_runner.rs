//! # Phase Execution Engine
//!
//! Walks one phase's ordered tool list and installs each tool through a
//! [`ToolInstaller`], strictly one after another. Later tools may rely on
//! files an earlier tool put on disk, so there is no parallelism.
//!
//! Per tool:
//!
//! - **Skip** if the run state records it as completed and `--force` is off.
//! - **Install** otherwise. On success the completion is persisted right
//!   away (not batched), so an abort later in the run keeps it.
//! - **Abort** on the first failure. Nothing after the failed tool runs.
//!
//! In simulate-only mode installers short-circuit on their own and the run
//! state is never written.

use std::io;
use std::path::PathBuf;

use colored::Colorize;
use thiserror::Error;

use crate::libs::context::RunContext;
use crate::libs::prompts::PromptError;
use crate::libs::state_management::{StateError, StateStore};
use crate::libs::utilities::exec::ExecError;
use crate::schemas::tools::ToolId;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Command(#[from] ExecError),
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("install finished but {0} is missing")]
    MissingArtifact(PathBuf),
    #[error("{0} not confirmed by operator")]
    NotConfirmed(String),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },
    #[error("{0}")]
    Precondition(String),
}

impl InstallError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| InstallError::Io { action, path, source }
    }
}

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("{tool} failed: {source}")]
    ToolFailed { tool: ToolId, source: InstallError },
    #[error("{tool} installed but its completion could not be recorded: {source}")]
    State { tool: ToolId, source: StateError },
}

/// Installs one tool. Implementations must be idempotent.
pub trait ToolInstaller {
    fn install(&self, tool: ToolId, ctx: &mut RunContext) -> Result<(), InstallError>;
}

/// What a phase did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseReport {
    pub installed: Vec<ToolId>,
    pub skipped: Vec<ToolId>,
}

pub fn run_phase(
    tools: &[ToolId],
    ctx: &mut RunContext,
    installer: &dyn ToolInstaller,
    state: &mut StateStore,
) -> Result<PhaseReport, PhaseError> {
    let mut report = PhaseReport::default();
    let total = tools.len();

    for (index, &tool) in tools.iter().enumerate() {
        println!("\n  [{}/{}] {}", index + 1, total, tool.as_str().bold());

        if !ctx.force {
            if let Some(completed_at) = state.completed_at(tool) {
                ctx.log
                    .info(tool.as_str(), &format!("already completed at {completed_at}, skipping"));
                println!("  [✓] {tool} already done");
                report.skipped.push(tool);
                continue;
            }
        }

        installer
            .install(tool, ctx)
            .map_err(|source| PhaseError::ToolFailed { tool, source })?;

        if !ctx.dry_run {
            state
                .mark_completed(tool)
                .map_err(|source| PhaseError::State { tool, source })?;
        }
        println!("  [{}] {} done", "✓".green(), tool);
        report.installed.push(tool);
    }

    Ok(report)
}
