//! # Execution Primitive
//!
//! Every external command the onboarding run issues goes through an
//! [`Executor`]. It owns three things:
//!
//! - the [`CommandRunner`] that actually spawns processes (a fake in tests),
//! - the simulate-only (`--dry-run`) switch, and
//! - the fixed base environment installers run under, so freshly installed
//!   Homebrew and pyenv binaries resolve without sourcing `~/.zshrc`.
//!
//! In simulate-only mode `run`, `sudo` and `interactive` only report what they
//! would have executed. `query` is read-only and always runs.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use thiserror::Error;

use crate::libs::run_log::RunLog;
use crate::schemas::log_record::fields;

/// Maximum number of characters of captured output kept in log records and errors.
const OUTPUT_LOG_LIMIT: usize = 500;

/// An external command: program, arguments and an optional environment that
/// replaces (not extends) the inherited one.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Option<Vec<(String, String)>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = Some(env);
        self
    }

    /// The same command run through `sudo`.
    pub fn with_sudo(self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            env: self.env,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a finished, captured command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    /// Human-readable exit status, e.g. `exit status: 1`.
    pub status: String,
    /// Combined stdout + stderr, trimmed.
    pub output: String,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("`{command}` failed ({status})\n{output}")]
    Failed {
        command: String,
        status: String,
        output: String,
    },
}

/// Spawns processes. `Send + Sync` so the keepalive thread can share one.
pub trait CommandRunner: Send + Sync {
    /// Runs to completion, capturing stdout and stderr together.
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput>;
    /// Runs attached to the terminal; returns whether it exited successfully.
    fn run_interactive(&self, spec: &CommandSpec) -> io::Result<bool>;
    /// Runs and returns trimmed stdout, or `None` on any failure.
    fn query(&self, spec: &CommandSpec) -> Option<String>;
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(spec: &CommandSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(env) = &spec.env {
            command.env_clear();
            command.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        command
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        tracing::debug!(command = %spec, "spawning captured command");
        let output = Self::command(spec).stdin(Stdio::null()).output()?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            output: combined.trim().to_string(),
        })
    }

    fn run_interactive(&self, spec: &CommandSpec) -> io::Result<bool> {
        tracing::debug!(command = %spec, "spawning interactive command");
        let status = Self::command(spec)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status.success())
    }

    fn query(&self, spec: &CommandSpec) -> Option<String> {
        let output = Self::command(spec).stdin(Stdio::null()).output().ok()?;
        if !output.status.success() {
            tracing::debug!(command = %spec, status = %output.status, "query failed");
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Environment installers run under, derived from the operator's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolEnv {
    home: String,
    user: String,
    logname: String,
}

impl ToolEnv {
    pub fn new(home: &Path, user: &str, logname: &str) -> Self {
        Self {
            home: home.to_string_lossy().into_owned(),
            user: user.to_string(),
            logname: logname.to_string(),
        }
    }

    fn search_path(&self, venv_bin: Option<&str>) -> String {
        let mut entries: Vec<String> = Vec::new();
        if let Some(bin) = venv_bin {
            entries.push(bin.to_string());
        }
        entries.extend(
            ["/opt/homebrew/bin", "/opt/homebrew/sbin", "/opt/local/bin", "/opt/local/sbin"]
                .iter()
                .map(|s| s.to_string()),
        );
        entries.push(format!("{}/.pyenv/bin", self.home));
        entries.push(format!("{}/.pyenv/shims", self.home));
        entries.extend(
            ["/usr/local/bin", "/usr/bin", "/bin", "/usr/sbin", "/sbin"]
                .iter()
                .map(|s| s.to_string()),
        );
        entries.join(":")
    }

    /// HOME, USER, PATH, pyenv and Homebrew variables, terminal and locale.
    pub fn base(&self) -> Vec<(String, String)> {
        self.with_path(self.search_path(None))
    }

    /// The base environment with the pyenv virtualenv `venv` activated.
    pub fn pyenv(&self, venv: &str) -> Vec<(String, String)> {
        let venv_root = format!("{}/.pyenv/versions/{}", self.home, venv);
        let mut env = self.with_path(self.search_path(Some(&format!("{venv_root}/bin"))));
        env.push(("PYENV_VERSION".to_string(), venv.to_string()));
        env.push(("VIRTUAL_ENV".to_string(), venv_root));
        env
    }

    fn with_path(&self, path: String) -> Vec<(String, String)> {
        vec![
            ("HOME".to_string(), self.home.clone()),
            ("USER".to_string(), self.user.clone()),
            ("LOGNAME".to_string(), self.logname.clone()),
            ("PATH".to_string(), path),
            ("PYENV_ROOT".to_string(), format!("{}/.pyenv", self.home)),
            ("HOMEBREW_PREFIX".to_string(), "/opt/homebrew".to_string()),
            ("HOMEBREW_CELLAR".to_string(), "/opt/homebrew/Cellar".to_string()),
            ("HOMEBREW_REPOSITORY".to_string(), "/opt/homebrew".to_string()),
            ("TERM".to_string(), "xterm-256color".to_string()),
            ("LANG".to_string(), "en_US.UTF-8".to_string()),
        ]
    }
}

/// Runs commands on behalf of installers, honoring simulate-only mode.
#[derive(Clone)]
pub struct Executor {
    runner: Arc<dyn CommandRunner>,
    log: Arc<RunLog>,
    dry_run: bool,
    env: ToolEnv,
}

impl Executor {
    pub fn new(runner: Arc<dyn CommandRunner>, log: Arc<RunLog>, dry_run: bool, env: ToolEnv) -> Self {
        Self {
            runner,
            log,
            dry_run,
            env,
        }
    }

    pub fn tool_env(&self) -> &ToolEnv {
        &self.env
    }

    /// Runs `spec` (under the base environment unless it carries its own)
    /// and returns the captured output. A non-zero exit is an error.
    pub fn run(&self, step: &str, spec: CommandSpec) -> Result<String, ExecError> {
        let spec = if spec.env.is_none() { spec.env(self.env.base()) } else { spec };
        let command = spec.to_string();
        if self.dry_run {
            self.log.info(step, &format!("DRY-RUN: would exec: {command}"));
            return Ok(String::new());
        }
        self.log.info(step, &format!("exec: {command}"));

        let outcome = self.runner.run(&spec).map_err(|source| {
            let error = source.to_string();
            self.log.error_with(
                step,
                "command failed to start",
                fields(&[("cmd", command.as_str()), ("error", error.as_str())]),
            );
            ExecError::Spawn {
                command: command.clone(),
                source,
            }
        })?;

        let mut record = fields(&[("cmd", command.as_str())]);
        if !outcome.output.is_empty() {
            record.insert("output".to_string(), truncate(&outcome.output, OUTPUT_LOG_LIMIT));
        }
        if outcome.success {
            self.log.info_with(step, "command ok", record);
            Ok(outcome.output)
        } else {
            record.insert("error".to_string(), outcome.status.clone());
            self.log.error_with(step, "command failed", record);
            Err(ExecError::Failed {
                command,
                status: outcome.status,
                output: outcome.output,
            })
        }
    }

    /// `run` through `sudo`. Relies on credentials cached at startup.
    pub fn sudo(&self, step: &str, spec: CommandSpec) -> Result<String, ExecError> {
        self.run(step, spec.with_sudo())
    }

    /// Runs attached to the terminal (for installers that open their own UI).
    pub fn interactive(&self, step: &str, spec: CommandSpec) -> Result<(), ExecError> {
        let spec = if spec.env.is_none() { spec.env(self.env.base()) } else { spec };
        let command = spec.to_string();
        if self.dry_run {
            self.log.info(step, &format!("DRY-RUN: would exec interactive: {command}"));
            return Ok(());
        }
        self.log.info(step, &format!("exec interactive: {command}"));
        match self.runner.run_interactive(&spec) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ExecError::Failed {
                command,
                status: "non-zero exit".to_string(),
                output: String::new(),
            }),
            Err(source) => Err(ExecError::Spawn { command, source }),
        }
    }

    /// Read-only query (e.g. `pmset -g custom`): runs even in simulate-only
    /// mode and yields `None` instead of an error.
    pub fn query(&self, spec: CommandSpec) -> Option<String> {
        self.runner.query(&spec)
    }
}

/// Cuts `s` to at most `limit` characters, marking the cut with `…`.
pub fn truncate(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((index, _)) => format!("{}…", &s[..index]),
        None => s.to_string(),
    }
}
