// Source checkouts for the internal tools: pull if a working copy is already
// there, clone otherwise.

use std::path::Path;

use crate::libs::utilities::exec::{CommandSpec, ExecError, Executor};
use crate::libs::utilities::path_helpers::path_exists;

pub fn clone_or_pull(exec: &Executor, step: &str, remote: &str, dir: &Path) -> Result<(), ExecError> {
    let dir_str = dir.to_string_lossy();
    if path_exists(&dir.join(".git")) {
        exec.run(step, CommandSpec::new("git").args(["-C", dir_str.as_ref(), "pull"]))?;
    } else {
        exec.run(step, CommandSpec::new("git").args(["clone", remote, dir_str.as_ref()]))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::utilities::exec::tests::{FakeRunner, executor};
    use std::fs;
    use std::sync::Arc;

    #[test]
    fn clones_when_no_working_copy() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let target = dir.path().join("silencer");
        clone_or_pull(&executor(Arc::clone(&runner), false), "silencer", "ssh://git@host/nse/silencer.git", &target)
            .unwrap();
        assert_eq!(
            runner.commands(),
            vec![format!("git clone ssh://git@host/nse/silencer.git {}", target.display())]
        );
    }

    #[test]
    fn pulls_when_working_copy_exists() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("silencer/.git")).unwrap();
        let runner = Arc::new(FakeRunner::default());
        let target = dir.path().join("silencer");
        clone_or_pull(&executor(Arc::clone(&runner), false), "silencer", "unused", &target).unwrap();
        assert_eq!(runner.commands(), vec![format!("git -C {} pull", target.display())]);
    }
}
