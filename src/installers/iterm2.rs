// iTerm2: download the stable archive and unpack it into /Applications.

use std::fs::File;
use std::io;
use std::path::Path;

use colored::Colorize;

use crate::installers::verify_artifact;
use crate::libs::context::{RunContext, arg};
use crate::libs::phase_runner::InstallError;
use crate::libs::utilities::exec::CommandSpec;
use crate::libs::utilities::path_helpers::path_exists;
use crate::log_debug;

const APP_NAME: &str = "iTerm.app";
const APPLICATIONS: &str = "/Applications";
const DOWNLOAD_URL: &str = "https://iterm2.com/downloads/stable/latest";

pub fn install(ctx: &mut RunContext) -> Result<(), InstallError> {
    install_with(ctx, Path::new(APPLICATIONS), DOWNLOAD_URL)
}

/// Installs `iTerm.app` into `applications` from the archive at `url`.
pub fn install_with(ctx: &RunContext, applications: &Path, url: &str) -> Result<(), InstallError> {
    let app = applications.join(APP_NAME);
    if path_exists(&app) {
        ctx.log.info("iterm2", "already installed, skipping");
        return Ok(());
    }

    // The scratch directory (and the archive in it) is removed on drop.
    let scratch = tempfile::tempdir().map_err(InstallError::io("create scratch dir", std::env::temp_dir()))?;
    let archive = scratch.path().join("iterm2.zip");
    ctx.log.info("iterm2", &format!("downloading {url}"));
    download_file(url, &archive)?;

    ctx.exec.run(
        "iterm2",
        CommandSpec::new("unzip").args(["-o".to_string(), arg(&archive), "-d".to_string(), arg(applications)]),
    )?;
    verify_artifact(&app)
}

/// Streams `url` into `dest`.
fn download_file(url: &str, dest: &Path) -> Result<(), InstallError> {
    log_debug!("[iTerm2] Starting download from URL: {}", url.blue());
    let response = ureq::get(url).call().map_err(|e| InstallError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut file = File::create(dest).map_err(InstallError::io("create", dest))?;
    io::copy(&mut response.into_reader(), &mut file).map_err(InstallError::io("write", dest))?;
    log_debug!("[iTerm2] Archive downloaded to {}", dest.display().to_string().green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::context::tests::context;
    use crate::libs::preflight::tests::one_shot_server;
    use crate::libs::utilities::exec::tests::FakeRunner;
    use std::fs;
    use std::sync::Arc;

    #[test]
    fn existing_app_is_not_downloaded_again() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join(APP_NAME)).unwrap();
        let runner = Arc::new(FakeRunner::default());
        let ctx = context(root.path(), Arc::clone(&runner), false, vec![]);

        // Nothing listens on port 9, so any download attempt would fail.
        install_with(&ctx, root.path(), "http://127.0.0.1:9/").unwrap();
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn archive_is_unpacked_into_applications() {
        let root = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let ctx = context(root.path(), Arc::clone(&runner), false, vec![]);

        // The fake unzip leaves no app behind.
        let err = install_with(&ctx, root.path(), &one_shot_server("200 OK")).unwrap_err();
        assert!(matches!(err, InstallError::MissingArtifact(ref path) if path == &root.path().join(APP_NAME)));
        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].starts_with("unzip -o "));
        assert!(commands[0].ends_with(&format!("iterm2.zip -d {}", root.path().display())));
    }

    #[test]
    fn failed_download_skips_the_unzip() {
        let root = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let ctx = context(root.path(), Arc::clone(&runner), false, vec![]);

        let err = install_with(&ctx, root.path(), &one_shot_server("404 Not Found")).unwrap_err();
        assert!(matches!(err, InstallError::Download { .. }));
        assert!(runner.commands().is_empty());
    }
}
