// `chs-onboard --list`: prints the tool catalog and exits. No log, no state.

use prettytable::format::consts::FORMAT_CLEAN;
use prettytable::{Table, row};

use crate::schemas::tools::catalog;

/// The catalog as a table: id, name, phase and direct prerequisites.
pub fn render() -> String {
    let mut table = Table::new();
    table.set_format(*FORMAT_CLEAN);
    table.set_titles(row!["ID", "NAME", "PHASE", "REQUIRES"]);
    for spec in catalog() {
        let requires = spec
            .prerequisites
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(row![spec.id.as_str(), spec.id.display_name(), spec.phase, requires]);
    }
    table.to_string()
}

pub fn run() {
    println!("Available tool IDs (--only=id1,id2,...):\n");
    print!("{}", render());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::tools::ToolId;

    #[test]
    fn every_tool_is_listed_in_catalog_order() {
        let table = render();
        let ids: Vec<&str> = table
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .skip(1)
            .collect();
        let expected: Vec<&str> = ToolId::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(ids, expected);
        assert!(table.contains("pyenv_venv_ncpcli, allproxy"));
    }
}
