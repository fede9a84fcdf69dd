// Guard-marked blocks for the operator's `~/.zshrc`.
//
// Each block starts with a `# BEGIN: <name>` line that doubles as its guard
// marker, so re-running the onboarding never duplicates a block. Blocks are
// only ever appended; existing content is left untouched.

use crate::libs::context::RunContext;
use crate::libs::phase_runner::InstallError;
use crate::libs::utilities::exec::CommandSpec;

pub const HOMEBREW_MARKER: &str = "# BEGIN: Homebrew";
pub const PYENV_MARKER: &str = "# BEGIN: pyenv";
pub const SLEEP_MARKER: &str = "# BEGIN: Sleep Controls";

const HOMEBREW_BLOCK: &str = r#"# BEGIN: Homebrew
eval "$(/opt/homebrew/bin/brew shellenv)"
# END: Homebrew"#;

pub const PYENV_BLOCK: &str = r#"# BEGIN: pyenv
export PYENV_ROOT="$HOME/.pyenv"
export PATH="$PYENV_ROOT/bin:$PATH"
eval "$(pyenv init -)"
eval "$(pyenv virtualenv-init -)"
# END: pyenv"#;

/// Homebrew and pyenv shell setup, written before any tool is installed.
pub fn write_base_blocks(ctx: &RunContext) -> Result<(), InstallError> {
    for (marker, block) in [(HOMEBREW_MARKER, HOMEBREW_BLOCK), (PYENV_MARKER, PYENV_BLOCK)] {
        ctx.append_zshrc_block(marker, block)
            .map_err(InstallError::io("append to", ctx.zshrc()))?;
    }
    Ok(())
}

/// Current power-management values the `ys` alias restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepSettings {
    pub sleep: String,
    pub hibernatemode: String,
    pub disablesleep: String,
}

impl SleepSettings {
    /// Reads `key` from `pmset -g custom` output. First matching line wins.
    fn value(pmset: &str, key: &str, fallback: &str) -> String {
        pmset
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(k), Some(v)) if k == key => Some(v.to_string()),
                    _ => None,
                }
            })
            .next()
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn parse(pmset: &str) -> Self {
        Self {
            sleep: Self::value(pmset, "sleep", "10"),
            hibernatemode: Self::value(pmset, "hibernatemode", "3"),
            disablesleep: Self::value(pmset, "disablesleep", "0"),
        }
    }

    pub fn block(&self) -> String {
        format!(
            "# BEGIN: Sleep Controls\n\
             alias ns='sudo pmset -a sleep 0; sudo pmset -a hibernatemode 0; sudo pmset -a disablesleep 1;'\n\
             alias ys='sudo pmset -a sleep {}; sudo pmset -a hibernatemode {}; sudo pmset -a disablesleep {};'\n\
             # END: Sleep Controls",
            self.sleep, self.hibernatemode, self.disablesleep
        )
    }
}

/// `ns` (no sleep) and `ys` (yes sleep) aliases. `ys` restores whatever
/// the machine is configured with now.
pub fn configure_sleep_aliases(ctx: &RunContext) -> Result<(), InstallError> {
    let pmset = ctx
        .exec
        .query(CommandSpec::new("pmset").args(["-g", "custom"]))
        .unwrap_or_default();
    let settings = SleepSettings::parse(&pmset);

    println!("\n── Sleep Settings ─────────────────────────────────────────────");
    println!(
        "  current pmset values: sleep={} hibernatemode={} disablesleep={}",
        settings.sleep, settings.hibernatemode, settings.disablesleep
    );
    ctx.append_zshrc_block(SLEEP_MARKER, &settings.block())
        .map_err(InstallError::io("append to", ctx.zshrc()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::context::tests::context;
    use crate::libs::utilities::exec::tests::FakeRunner;
    use std::fs;
    use std::sync::Arc;

    const PMSET: &str = "Battery Power:\n sleep                1\n hibernatemode        25\nAC Power:\n sleep                0\n hibernatemode        3\n";

    #[test]
    fn pmset_values_fall_back_when_missing() {
        let settings = SleepSettings::parse(PMSET);
        assert_eq!(settings.sleep, "1");
        assert_eq!(settings.hibernatemode, "25");
        assert_eq!(settings.disablesleep, "0");
        assert_eq!(
            SleepSettings::parse(""),
            SleepSettings {
                sleep: "10".into(),
                hibernatemode: "3".into(),
                disablesleep: "0".into()
            }
        );
    }

    #[test]
    fn base_blocks_are_written_once() {
        let home = tempfile::tempdir().unwrap();
        let ctx = context(home.path(), Arc::new(FakeRunner::default()), false, vec![]);
        write_base_blocks(&ctx).unwrap();
        write_base_blocks(&ctx).unwrap();
        let zshrc = fs::read_to_string(home.path().join(".zshrc")).unwrap();
        assert_eq!(zshrc.matches(HOMEBREW_MARKER).count(), 1);
        assert_eq!(zshrc.matches(PYENV_MARKER).count(), 1);
    }

    #[test]
    fn sleep_aliases_restore_current_values() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        runner.answer_query("pmset -g custom", PMSET);
        let ctx = context(home.path(), runner, false, vec![]);
        configure_sleep_aliases(&ctx).unwrap();
        let zshrc = fs::read_to_string(home.path().join(".zshrc")).unwrap();
        assert!(zshrc.contains("alias ys='sudo pmset -a sleep 1; sudo pmset -a hibernatemode 25; sudo pmset -a disablesleep 0;'"));
    }

    #[test]
    fn dry_run_leaves_zshrc_alone() {
        let home = tempfile::tempdir().unwrap();
        let ctx = context(home.path(), Arc::new(FakeRunner::default()), true, vec![]);
        write_base_blocks(&ctx).unwrap();
        configure_sleep_aliases(&ctx).unwrap();
        assert!(!home.path().join(".zshrc").exists());
    }
}
