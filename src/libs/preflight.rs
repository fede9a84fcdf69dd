// This module runs the preflight checks that happen before any installer.
// It makes sure the run can actually succeed and collects the values that
// later phases need:
//
// - Public internet must be reachable (VPN off) for the public phase.
// - An SSH public key must exist; one is generated if missing. It is kept
//   in the run context and presented after the VPN switch, when the
//   operator can reach the key settings page.
// - The operator's GUID is taken from `--guid` or asked for.
// - With `--rename-account` only, the local account's display name and the
//   computer name can be set to the GUID after an explicit confirmation.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use thiserror::Error;

use crate::libs::context::{RunContext, arg};
use crate::libs::prompts::PromptError;
use crate::libs::utilities::exec::{CommandSpec, ExecError};
use crate::libs::utilities::path_helpers::path_exists;
use crate::schemas::log_record::fields;

const DRY_RUN_KEY_PLACEHOLDER: &str = "<dry-run: ssh public key would be generated here>";

#[derive(Debug, Error)]
pub enum NetError {
    #[error("{url} answered with HTTP {code}")]
    Status { url: String, code: u16 },
    #[error("{url} unreachable: {reason}")]
    Transport { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("public internet unreachable, ensure VPN is OFF before running the public phase: {0}")]
    PublicInternet(#[source] NetError),
    #[error("could not read public key at {path}: {source}")]
    KeyRead { path: PathBuf, source: std::io::Error },
    #[error("SSH key generation failed: {0}")]
    KeyGeneration(#[source] ExecError),
    #[error("oracle GUID is required")]
    IdentityMissing,
    #[error("SSH key not added to Bitbucket, cannot continue")]
    SshKeyNotAdded,
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Command(#[from] ExecError),
}

/// HTTP HEAD against `url`. Any transport error or a status of 400 and
/// above counts as unreachable.
pub fn check_public_internet(url: &str, timeout: Duration) -> Result<(), NetError> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    match agent.head(url).call() {
        Ok(_) => Ok(()),
        Err(ureq::Error::Status(code, _)) => Err(NetError::Status {
            url: url.to_string(),
            code,
        }),
        Err(ureq::Error::Transport(transport)) => Err(NetError::Transport {
            url: url.to_string(),
            reason: transport.to_string(),
        }),
    }
}

/// Runs every preflight step in order. Sets the log phase to `preflight`.
pub fn run_preflight(ctx: &mut RunContext, guid_flag: Option<&str>) -> Result<(), PreflightError> {
    ctx.log.set_phase("preflight");
    println!("\n{}", "── Preflight ─────────────────────────────────────────────────".bold());

    net_check(ctx)?;
    ensure_ssh_key(ctx)?;
    let guid = collect_identity(ctx, guid_flag)?;
    ctx.identity = Some(guid);
    if ctx.rename_account {
        rename_account(ctx)?;
    } else {
        ctx.log
            .info("identity", "account rename disabled; GUID will only be used for tool config");
    }
    Ok(())
}

pub fn net_check(ctx: &RunContext) -> Result<(), PreflightError> {
    ctx.log.info("net_check", "checking public internet reachability");
    match check_public_internet(&ctx.config.public_check_url, ctx.config.public_check_timeout()) {
        Ok(()) => {
            ctx.log.info("net_check", "public internet reachable");
            Ok(())
        }
        Err(e) if ctx.dry_run => {
            ctx.log.warn_with(
                "net_check",
                "DRY-RUN: public internet unreachable, a real run would stop here",
                fields(&[("error", e.to_string())]),
            );
            Ok(())
        }
        Err(e) => Err(PreflightError::PublicInternet(e)),
    }
}

/// Finds (or generates) the operator's SSH public key and caches it in the
/// context.
pub fn ensure_ssh_key(ctx: &mut RunContext) -> Result<(), PreflightError> {
    let candidates = [ctx.home_path(".ssh/id_ed25519.pub"), ctx.home_path(".ssh/id_rsa.pub")];
    let existing = candidates.iter().find(|p| path_exists(p)).cloned();

    let public_key_path = match existing {
        Some(path) => path,
        None if ctx.dry_run => {
            ctx.log
                .info("ssh_key", "DRY-RUN: no SSH key found; would generate ed25519 key");
            ctx.ssh_public_key = Some(DRY_RUN_KEY_PLACEHOLDER.to_string());
            return Ok(());
        }
        None => {
            ctx.log.info("ssh_key", "no SSH key found, generating ed25519 key");
            let email = ctx.prompter.input(
                "SSH Key Setup",
                "Enter your Oracle email for SSH key generation",
                "firstname.lastname@oracle.com",
            )?;
            let key_path = ctx.home_path(".ssh/id_ed25519");
            ctx.exec
                .run(
                    "ssh_key",
                    CommandSpec::new("ssh-keygen").args([
                        "-t".to_string(),
                        "ed25519".to_string(),
                        "-C".to_string(),
                        email.trim().to_string(),
                        "-f".to_string(),
                        arg(&key_path),
                        "-N".to_string(),
                        String::new(),
                    ]),
                )
                .map_err(PreflightError::KeyGeneration)?;
            ctx.log
                .info_with("ssh_key", "SSH key generated", fields(&[("path", arg(&key_path))]));
            key_path.with_extension("pub")
        }
    };

    let key = fs::read_to_string(&public_key_path).map_err(|source| PreflightError::KeyRead {
        path: public_key_path.clone(),
        source,
    })?;
    ctx.ssh_public_key = Some(key.trim().to_string());
    ctx.log
        .info("ssh_key", "SSH public key ready; Bitbucket add step deferred until VPN is connected");
    Ok(())
}

/// The operator GUID: `--guid` if given, otherwise prompted. Blank is an error.
pub fn collect_identity(ctx: &mut RunContext, guid_flag: Option<&str>) -> Result<String, PreflightError> {
    let raw = match guid_flag {
        Some(guid) => guid.to_string(),
        None => ctx
            .prompter
            .input("Oracle Identity", "Enter your Oracle GUID (e.g. jsmith)", "")
            .map_err(|e| {
                ctx.log.warn_with("identity", "identity prompt failed", fields(&[("error", e.to_string())]));
                PreflightError::IdentityMissing
            })?,
    };
    let guid = raw.trim();
    if guid.is_empty() {
        return Err(PreflightError::IdentityMissing);
    }
    ctx.log
        .info_with("identity", "oracle GUID entered", fields(&[("guid", guid)]));
    Ok(guid.to_string())
}

/// Sets the account's RealName and the computer name to the GUID, after
/// the operator confirms. Never logs the operator out.
pub fn rename_account(ctx: &mut RunContext) -> Result<(), PreflightError> {
    let guid = ctx.identity().to_string();
    let user = ctx.user.clone();
    println!(
        "\n  {} This changes the display name of account '{}' and the computer name to '{}'.",
        "[!]".yellow(),
        user,
        guid
    );
    let accepted = ctx.prompter.confirm(
        "Account Rename",
        &format!("Rename account '{user}' and this computer to '{guid}'?"),
    )?;
    if !accepted {
        ctx.log.info("identity", "account rename declined; nothing changed");
        return Ok(());
    }

    let account = format!("/Users/{user}");
    ctx.exec.sudo(
        "identity",
        CommandSpec::new("dscl").args([".", "-create", account.as_str(), "RealName", guid.as_str()]),
    )?;
    ctx.exec
        .sudo("identity", CommandSpec::new("scutil").args(["--set", "ComputerName", guid.as_str()]))?;
    ctx.log
        .info_with("identity", "account renamed", fields(&[("user", user.as_str()), ("guid", guid.as_str())]));
    println!("  [→] Log out and back in for the new account name to show everywhere.");
    Ok(())
}

/// Shows the cached public key once the private network is up, optionally
/// opens the key settings page, and waits for the operator to confirm.
pub fn present_ssh_key(ctx: &mut RunContext) -> Result<(), PreflightError> {
    let Some(key) = ctx.ssh_public_key.clone() else {
        ctx.log
            .warn("ssh_key", "no cached SSH key found from preflight; skipping Bitbucket prompt");
        return Ok(());
    };
    if ctx.dry_run {
        ctx.log
            .info("ssh_key", "DRY-RUN: would prompt user to add SSH key in Bitbucket now");
        return Ok(());
    }

    ctx.log.info("ssh_key", "presenting SSH public key for Bitbucket add");
    println!("\n  Your SSH public key, add this to Bitbucket:\n\n  {}\n", key.cyan());
    let open_page = ctx
        .prompter
        .confirm("SSH Public Key", "Open the Bitbucket SSH key page now? (No = already added)")?;
    if !open_page {
        return Ok(());
    }

    let url = ctx.config.ssh_keys_url.clone();
    if let Err(e) = ctx.exec.run("ssh_key", CommandSpec::new("open").arg(url.as_str())) {
        ctx.log.warn_with(
            "ssh_key",
            "could not open the key settings page",
            fields(&[("url", url.as_str()), ("error", e.to_string().as_str())]),
        );
    }
    if ctx
        .prompter
        .confirm("SSH Key", "Have you added the SSH key to Bitbucket?")?
    {
        Ok(())
    } else {
        Err(PreflightError::SshKeyNotAdded)
    }
}

/// Informational re-check after the VPN switch; never fails the run.
pub fn recheck_public_internet(ctx: &RunContext) {
    match check_public_internet(&ctx.config.public_check_url, ctx.config.public_check_timeout()) {
        Ok(()) => ctx.log.info("net_check", "public internet reachable while on VPN"),
        Err(e) => ctx.log.warn_with(
            "net_check",
            "public internet currently unreachable while on VPN (can be expected before full VPN)",
            fields(&[("error", e.to_string())]),
        ),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::libs::context::tests::context;
    use crate::libs::prompts::tests::Answer;
    use crate::libs::utilities::exec::tests::FakeRunner;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    /// Serves one HTTP response with `status` and returns the URL.
    pub(crate) fn one_shot_server(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = write!(stream, "HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            }
        });
        url
    }

    #[test]
    fn head_ok_is_reachable() {
        let url = one_shot_server("200 OK");
        assert!(check_public_internet(&url, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn error_status_is_unreachable() {
        let url = one_shot_server("503 Service Unavailable");
        assert!(matches!(
            check_public_internet(&url, Duration::from_secs(5)),
            Err(NetError::Status { code: 503, .. })
        ));
    }

    #[test]
    fn dry_run_downgrades_failed_net_check() {
        let home = tempfile::tempdir().unwrap();
        let mut ctx = context(home.path(), Arc::new(FakeRunner::default()), true, vec![]);
        ctx.config.public_check_url = "http://127.0.0.1:9".to_string();
        ctx.config.public_check_timeout_secs = 1;
        assert!(net_check(&ctx).is_ok());
        ctx.dry_run = false;
        assert!(matches!(net_check(&ctx), Err(PreflightError::PublicInternet(_))));
    }

    #[test]
    fn existing_key_is_cached() {
        let home = tempfile::tempdir().unwrap();
        fs::create_dir_all(home.path().join(".ssh")).unwrap();
        fs::write(home.path().join(".ssh/id_rsa.pub"), "ssh-rsa AAAA op@host\n").unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mut ctx = context(home.path(), Arc::clone(&runner), false, vec![]);
        ensure_ssh_key(&mut ctx).unwrap();
        assert_eq!(ctx.ssh_public_key.as_deref(), Some("ssh-rsa AAAA op@host"));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn missing_key_in_dry_run_caches_placeholder() {
        let home = tempfile::tempdir().unwrap();
        let mut ctx = context(home.path(), Arc::new(FakeRunner::default()), true, vec![]);
        ensure_ssh_key(&mut ctx).unwrap();
        assert_eq!(ctx.ssh_public_key.as_deref(), Some(DRY_RUN_KEY_PLACEHOLDER));
        assert!(!home.path().join(".ssh").exists());
    }

    #[test]
    fn missing_key_runs_ssh_keygen_with_prompted_email() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mut ctx = context(
            home.path(),
            Arc::clone(&runner),
            false,
            vec![Answer::Text("jane.smith@oracle.com".into())],
        );
        // The fake runner does not create the key, so reading it back fails.
        assert!(matches!(ensure_ssh_key(&mut ctx), Err(PreflightError::KeyRead { .. })));
        let commands = runner.commands();
        assert!(commands[0].starts_with("ssh-keygen -t ed25519 -C jane.smith@oracle.com -f "));
    }

    #[test]
    fn guid_flag_skips_the_prompt() {
        let home = tempfile::tempdir().unwrap();
        let mut ctx = context(home.path(), Arc::new(FakeRunner::default()), false, vec![]);
        assert_eq!(collect_identity(&mut ctx, Some(" jsmith ")).unwrap(), "jsmith");
    }

    #[test]
    fn blank_or_cancelled_identity_fails() {
        let home = tempfile::tempdir().unwrap();
        let mut ctx = context(
            home.path(),
            Arc::new(FakeRunner::default()),
            false,
            vec![Answer::Text("   ".into()), Answer::Cancel],
        );
        assert!(matches!(collect_identity(&mut ctx, None), Err(PreflightError::IdentityMissing)));
        assert!(matches!(collect_identity(&mut ctx, None), Err(PreflightError::IdentityMissing)));
    }

    #[test]
    fn declined_rename_changes_nothing() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mut ctx = context(home.path(), Arc::clone(&runner), false, vec![Answer::No]);
        rename_account(&mut ctx).unwrap();
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn accepted_rename_runs_both_sudo_commands() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mut ctx = context(home.path(), Arc::clone(&runner), false, vec![Answer::Yes]);
        rename_account(&mut ctx).unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "sudo dscl . -create /Users/op RealName jsmith".to_string(),
                "sudo scutil --set ComputerName jsmith".to_string(),
            ]
        );
    }

    #[test]
    fn unconfirmed_key_registration_stops_the_run() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mut ctx = context(home.path(), Arc::clone(&runner), false, vec![Answer::Yes, Answer::No]);
        ctx.ssh_public_key = Some("ssh-ed25519 AAAA".into());
        assert!(matches!(present_ssh_key(&mut ctx), Err(PreflightError::SshKeyNotAdded)));
        assert!(runner.commands()[0].starts_with("open https://"));
    }

    #[test]
    fn already_added_key_continues() {
        let home = tempfile::tempdir().unwrap();
        let mut ctx = context(home.path(), Arc::new(FakeRunner::default()), false, vec![Answer::No]);
        ctx.ssh_public_key = Some("ssh-ed25519 AAAA".into());
        assert!(present_ssh_key(&mut ctx).is_ok());
    }
}
