//! # Internal Repository Tools
//!
//! Tools that live in internal git repositories and are only reachable on
//! the private network. Each one starts with a clone-or-pull of its
//! checkout under the operator's home directory, then runs whatever that
//! repository needs: an editable pip install, a `make` target, a setup
//! script, or copying files out of it.
//!
//! Symlinks into `/usr/local/bin` need `sudo` and are only created when the
//! link is missing.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::installers::pyenv::{NCPCLI_VENV, PYTHON_313};
use crate::libs::context::{RunContext, arg};
use crate::libs::phase_runner::InstallError;
use crate::libs::utilities::exec::CommandSpec;
use crate::libs::utilities::git::clone_or_pull;
use crate::libs::utilities::path_helpers::path_exists;
use crate::log_debug;
use crate::schemas::log_record::fields;

const GNOC_MARKER: &str = "# BEGIN: GNOC Temp Help";

/// Python packages gnoc-helper's scripts import.
const GNOC_PIP_PACKAGES: [&str; 6] = ["rust", "cffi==1.16.0", "cryptography", "asyncssh", "pproxy", "pyyaml"];

/// Clone-or-pull `repo_path` (relative to the configured git base) into
/// `~/<checkout>` and return the checkout path.
fn checkout(ctx: &RunContext, step: &str, repo_path: &str, checkout: &str) -> Result<PathBuf, InstallError> {
    let dir = ctx.home_path(checkout);
    clone_or_pull(&ctx.exec, step, &ctx.config.git_remote(repo_path), &dir)?;
    Ok(dir)
}

/// `sudo ln -s target link` unless `link` already exists.
fn link_if_missing(ctx: &RunContext, step: &str, target: &Path, link: &str) -> Result<(), InstallError> {
    if path_exists(Path::new(link)) {
        log_debug!("[{}] {} already present", step, link);
        return Ok(());
    }
    ctx.exec
        .sudo(step, CommandSpec::new("ln").args(["-s".to_string(), arg(target), link.to_string()]))?;
    Ok(())
}

pub fn install_allproxy(ctx: &mut RunContext) -> Result<(), InstallError> {
    let dir = checkout(ctx, "allproxy", "~rralliso/misc-tools.git", "misc-tools")?;
    ctx.exec.run(
        "allproxy",
        CommandSpec::new(arg(&ctx.pip(PYTHON_313))).args(["install".to_string(), "-e".to_string(), arg(&dir.join("allproxy"))]),
    )?;
    Ok(())
}

/// Copies the sparta-pki trust roots into `~/sparta_roots`. The checkout is
/// scratch space and removed afterwards.
pub fn install_sparta_pki(ctx: &mut RunContext) -> Result<(), InstallError> {
    let roots_dir = ctx.home_path("sparta_roots");
    fs::create_dir_all(&roots_dir).map_err(InstallError::io("create", &roots_dir))?;

    let scratch = checkout(ctx, "sparta_pki", "secinf/sparta-pki.git", "sparta-pki")?;
    let trustroots = scratch.join("trustroots");
    if !trustroots.is_dir() {
        return Err(InstallError::Precondition(format!(
            "sparta-pki trustroots dir not found at {}",
            trustroots.display()
        )));
    }

    let mut copied = 0usize;
    for entry in WalkDir::new(&trustroots).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| InstallError::Precondition(format!("reading {}: {e}", trustroots.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let target = roots_dir.join(entry.file_name());
        fs::copy(entry.path(), &target).map_err(InstallError::io("copy to", &target))?;
        copied += 1;
    }
    ctx.log.info_with(
        "sparta_pki",
        "trust roots installed",
        fields(&[("count", copied.to_string()), ("dir", arg(&roots_dir))]),
    );

    fs::remove_dir_all(&scratch).map_err(InstallError::io("remove", &scratch))?;
    Ok(())
}

fn gnoc_block(guid: &str) -> String {
    format!(
        r#"# BEGIN: GNOC Temp Help
export OCI_USER="{guid}"
export AUTONET_PLANS_PATH="/path/to/plans"       # Ask your trainer
export GNOC_TEMPLATES_PATH="/path/to/templates"  # Ask your trainer

alias jit-pass="$HOME/gnoc-jit-pass/wrapper.sh"

rekey() {{
    ssh-add -D
    for key in ~/.ssh/id_*; do
        [[ "$key" == *.pub ]] && continue
        if grep -q "PRIVATE KEY" "$key"; then
            ssh-add "$key" >/dev/null 2>&1 && echo "Loaded $key"
        fi
    done
    ssh-add -s /usr/local/lib/opensc-pkcs11.so 2>/dev/null
}}
# END: GNOC Temp Help"#
    )
}

pub fn install_gnoc_helper(ctx: &mut RunContext) -> Result<(), InstallError> {
    let dir = checkout(ctx, "gnoc_helper", "gnoc/gnoc-helper.git", "gnoc-helper")?;

    ctx.append_zshrc_block(GNOC_MARKER, &gnoc_block(ctx.identity()))
        .map_err(InstallError::io("append to", ctx.zshrc()))?;

    for (script, link) in [
        ("gnoc-helper.sh", "/usr/local/bin/gnoc-helper"),
        ("scripts/rack-finder.sh", "/usr/local/bin/rack-finder"),
        ("scripts/console-finder.sh", "/usr/local/bin/console-finder"),
    ] {
        link_if_missing(ctx, "gnoc_helper", &dir.join(script), link)?;
    }

    ctx.exec
        .run("gnoc_helper", CommandSpec::new("/usr/local/bin/gnoc-helper").arg("--setup"))?;
    ctx.exec.run(
        "gnoc_helper",
        CommandSpec::new(arg(&ctx.pip(PYTHON_313)))
            .arg("install")
            .args(GNOC_PIP_PACKAGES),
    )?;
    Ok(())
}

pub fn install_stencil(ctx: &mut RunContext) -> Result<(), InstallError> {
    let stencil_dir = checkout(ctx, "stencil", "nse/stencil.git", "stencil")?;
    checkout(ctx, "stencil", "gnoc/stencil-temp-gnoc.git", "stencil-temp-gnoc")?;

    let env = ctx.exec.tool_env().pyenv(NCPCLI_VENV);
    ctx.exec.run(
        "stencil",
        CommandSpec::new(arg(&ctx.pip(NCPCLI_VENV)))
            .args(["install".to_string(), format!("{}/.", arg(&stencil_dir))])
            .env(env.clone()),
    )?;

    let stencil_bin = ctx.pyenv_version_dir(NCPCLI_VENV).join("bin").join("stencil");
    link_if_missing(ctx, "stencil", &stencil_bin, "/usr/local/bin/stencil")?;
    ctx.exec
        .run("stencil", CommandSpec::new("/usr/local/bin/stencil").arg("init").env(env))?;
    Ok(())
}

pub fn install_silencer(ctx: &mut RunContext) -> Result<(), InstallError> {
    let dir = checkout(ctx, "silencer", "nse/silencer.git", "silencer")?;
    for target in ["install", "link"] {
        ctx.exec.run(
            "silencer",
            CommandSpec::new("make").args(["-C".to_string(), arg(&dir), target.to_string()]),
        )?;
    }
    Ok(())
}

pub fn install_jit_pass(ctx: &mut RunContext) -> Result<(), InstallError> {
    let dir = checkout(ctx, "jit_pass", "gnoc/gnoc-jit-pass.git", "gnoc-jit-pass")?;
    ctx.exec
        .run("jit_pass", CommandSpec::new(arg(&dir.join("wrapper.sh"))))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::context::tests::context;
    use crate::libs::utilities::exec::tests::FakeRunner;
    use std::sync::Arc;

    #[test]
    fn sparta_roots_are_copied_and_checkout_removed() {
        let home = tempfile::tempdir().unwrap();
        let checkout_dir = home.path().join("sparta-pki");
        fs::create_dir_all(checkout_dir.join(".git")).unwrap();
        fs::create_dir_all(checkout_dir.join("trustroots/nested")).unwrap();
        fs::write(checkout_dir.join("trustroots/root-ca.pem"), "ROOT").unwrap();
        fs::write(checkout_dir.join("trustroots/issuing-ca.pem"), "ISSUING").unwrap();

        let runner = Arc::new(FakeRunner::default());
        let mut ctx = context(home.path(), Arc::clone(&runner), false, vec![]);
        install_sparta_pki(&mut ctx).unwrap();

        let roots = home.path().join("sparta_roots");
        assert_eq!(fs::read_to_string(roots.join("root-ca.pem")).unwrap(), "ROOT");
        assert_eq!(fs::read_to_string(roots.join("issuing-ca.pem")).unwrap(), "ISSUING");
        assert!(!roots.join("nested").exists());
        assert!(!checkout_dir.exists());
        assert_eq!(runner.commands(), vec![format!("git -C {} pull", checkout_dir.display())]);
    }

    #[test]
    fn sparta_without_trustroots_fails() {
        let home = tempfile::tempdir().unwrap();
        let mut ctx = context(home.path(), Arc::new(FakeRunner::default()), false, vec![]);
        assert!(matches!(install_sparta_pki(&mut ctx), Err(InstallError::Precondition(_))));
    }

    #[test]
    fn gnoc_block_carries_identity_once() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let mut ctx = context(home.path(), Arc::clone(&runner), false, vec![]);
        install_gnoc_helper(&mut ctx).unwrap();
        install_gnoc_helper(&mut ctx).unwrap();

        let zshrc = fs::read_to_string(home.path().join(".zshrc")).unwrap();
        assert_eq!(zshrc.matches(GNOC_MARKER).count(), 1);
        assert!(zshrc.contains("export OCI_USER=\"jsmith\""));
        assert!(zshrc.contains("rekey() {\n    ssh-add -D"));

        let commands = runner.commands();
        assert!(commands[0].starts_with("git clone ssh://git@bitbucket.oci.oraclecorp.com:7999/gnoc/gnoc-helper.git"));
        assert!(commands.contains(&"/usr/local/bin/gnoc-helper --setup".to_string()));
    }

    #[test]
    fn failed_make_target_stops_silencer() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        runner.fail_when("install", "make: *** No rule to make target");
        let mut ctx = context(home.path(), Arc::clone(&runner), false, vec![]);
        assert!(install_silencer(&mut ctx).is_err());
        assert!(!runner.commands().iter().any(|c| c.ends_with(" link")));
    }
}
