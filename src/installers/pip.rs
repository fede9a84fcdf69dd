// Python CLIs installed from the internal package index.
//
// hops-cli goes into the 3.13.2 interpreter, ncpcli into its own pyenv
// virtualenv. The pip cache purge before each install is best-effort.

use crate::installers::pyenv::{NCPCLI_VENV, PYTHON_313};
use crate::libs::context::{RunContext, arg};
use crate::libs::phase_runner::InstallError;
use crate::libs::utilities::exec::CommandSpec;

/// setuptools pin hops-cli currently needs to import cleanly.
const SETUPTOOLS_PIN: &str = "setuptools==81.0.0";

fn purge_cache(ctx: &RunContext, step: &str, pip: &str, env: Option<Vec<(String, String)>>) {
    let mut spec = CommandSpec::new(pip).args(["cache", "purge"]);
    if let Some(env) = env {
        spec = spec.env(env);
    }
    if ctx.exec.run(step, spec).is_err() {
        ctx.log.warn(step, "pip cache purge failed, continuing");
    }
}

pub fn install_hops_cli(ctx: &mut RunContext) -> Result<(), InstallError> {
    let pip = arg(&ctx.pip(PYTHON_313));
    purge_cache(ctx, "hops_cli", &pip, None);
    ctx.exec
        .run("hops_cli", CommandSpec::new(&pip).args(["install", "--upgrade", "pip"]))?;
    ctx.exec.run(
        "hops_cli",
        CommandSpec::new(&pip).args([
            "install",
            "--default-timeout=100",
            "-U",
            "--index-url",
            ctx.config.package_index_url.as_str(),
            "hops-cli",
        ]),
    )?;
    ctx.exec.run(
        "hops_cli",
        CommandSpec::new(&pip).args(["install", "--no-cache-dir", "--force-reinstall", SETUPTOOLS_PIN]),
    )?;
    Ok(())
}

pub fn install_ncpcli(ctx: &mut RunContext) -> Result<(), InstallError> {
    let pip = arg(&ctx.pip(NCPCLI_VENV));
    let env = ctx.exec.tool_env().pyenv(NCPCLI_VENV);

    purge_cache(ctx, "ncpcli", &pip, Some(env.clone()));
    ctx.exec.run(
        "ncpcli",
        CommandSpec::new(&pip).args(["install", "--upgrade", "pip"]).env(env.clone()),
    )?;

    // The cryptography build needs OpenSSL 1.1 headers from Homebrew.
    let openssl = ctx
        .exec
        .query(CommandSpec::new(crate::installers::homebrew::BREW).args(["--prefix", "openssl@1.1"]))
        .unwrap_or_default();
    let mut build_env = env;
    build_env.push(("LDFLAGS".to_string(), format!("-L{openssl}/lib")));
    build_env.push(("CFLAGS".to_string(), format!("-I{openssl}/include")));

    ctx.exec.run(
        "ncpcli",
        CommandSpec::new(&pip)
            .args([
                "install",
                "--index-url",
                ctx.config.package_index_url.as_str(),
                "--trusted-host",
                ctx.config.package_index_host(),
                "ncpcli",
            ])
            .env(build_env.clone()),
    )?;

    let ncpcli = arg(&ctx.pyenv_version_dir(NCPCLI_VENV).join("bin").join("ncpcli"));
    ctx.exec
        .run("ncpcli", CommandSpec::new(ncpcli).arg("--rebuild-config").env(build_env))?;
    Ok(())
}
