// Turns operator input into a resolution request: either the `--only` list
// or an interactive multi-selection over the catalog.

use crate::libs::prompts::{PromptError, Prompter};
use crate::schemas::tools::{BASE_SELECTION, GNOC_COMPANIONS, ToolId};

/// Parsed `--only` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnlySelection {
    /// Recognized tools, in the order given.
    pub tools: Vec<ToolId>,
    /// Entries that matched no tool, as written.
    pub unknown: Vec<String>,
}

/// Splits a comma-separated `--only` value. Blank entries are ignored.
pub fn parse_only(raw: &str) -> OnlySelection {
    let mut selection = OnlySelection::default();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.parse::<ToolId>() {
            Ok(tool) => selection.tools.push(tool),
            Err(_) => selection.unknown.push(entry.to_string()),
        }
    }
    selection
}

/// Asks which tools to install. `include_gnoc` pre-checks `gnoc_helper`;
/// picking `gnoc_helper` also brings in its companion tools.
pub fn prompt_selection(prompter: &mut dyn Prompter, include_gnoc: bool) -> Result<Vec<ToolId>, PromptError> {
    let mut options: Vec<String> = ToolId::ALL.iter().map(|t| t.as_str().to_string()).collect();
    options.sort();

    let mut defaults: Vec<String> = BASE_SELECTION.iter().map(|t| t.as_str().to_string()).collect();
    if include_gnoc {
        defaults.push(ToolId::GnocHelper.as_str().to_string());
    }

    // Dismissing the dialog is an empty selection, not a failure.
    let picked = match prompter.choose(
        "CHS Onboard Tool Selection",
        "Choose which tools to install. If gnoc_helper is selected, stencil/silencer/jit_pass are included automatically.",
        &options,
        &defaults,
    ) {
        Ok(picked) => picked,
        Err(PromptError::Cancelled(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut selected: Vec<ToolId> = picked.iter().filter_map(|name| name.parse().ok()).collect();
    if selected.contains(&ToolId::GnocHelper) {
        selected.extend(GNOC_COMPANIONS);
    }
    Ok(selected)
}
