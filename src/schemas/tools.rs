//! # Tool Catalog
//!
//! The fixed set of installable units this onboarding tool knows about. Tools
//! are statically defined: there is no runtime tool creation and no config
//! file that adds new ones. Each entry carries
//!
//! - a stable key (`ToolId`, snake_case, used by `--only` and `state.json`),
//! - a human-readable name,
//! - its direct prerequisites (edges of the dependency graph), and
//! - the network phase it must run in.
//!
//! The graph formed by the prerequisites must be acyclic; `libs::resolver`
//! checks that once at startup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network window a tool must be installed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Requires unrestricted internet access (VPN off).
    Public,
    /// Requires the private network (VPN on).
    Private,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::Public => write!(f, "public"),
            Phase::Private => write!(f, "private"),
        }
    }
}

/// Stable identifier of one tool in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    Xcode,
    Homebrew,
    Pyenv,
    Python313,
    Python396,
    PyenvVenvNcpcli,
    Iterm2,
    Allproxy,
    SpartaPki,
    HopsCli,
    GnocHelper,
    Stencil,
    Silencer,
    Ncpcli,
    JitPass,
}

/// Static description of a tool.
#[derive(Debug)]
pub struct ToolSpec {
    pub id: ToolId,
    pub name: &'static str,
    pub prerequisites: &'static [ToolId],
    pub phase: Phase,
}

// Catalog order is also the order `--list` prints in.
static CATALOG: [ToolSpec; 15] = [
    ToolSpec { id: ToolId::Xcode, name: "Xcode Command Line Tools", prerequisites: &[], phase: Phase::Public },
    ToolSpec { id: ToolId::Homebrew, name: "Homebrew + base formulae", prerequisites: &[ToolId::Xcode], phase: Phase::Public },
    ToolSpec { id: ToolId::Pyenv, name: "pyenv shell integration", prerequisites: &[ToolId::Homebrew], phase: Phase::Public },
    ToolSpec { id: ToolId::Python313, name: "Python 3.13.2 (pyenv)", prerequisites: &[ToolId::Pyenv], phase: Phase::Public },
    ToolSpec { id: ToolId::Python396, name: "Python 3.9.6 (pyenv)", prerequisites: &[ToolId::Pyenv], phase: Phase::Public },
    ToolSpec {
        id: ToolId::PyenvVenvNcpcli,
        name: "ncpcli virtualenv",
        prerequisites: &[ToolId::Python396],
        phase: Phase::Public,
    },
    ToolSpec { id: ToolId::Iterm2, name: "iTerm2", prerequisites: &[], phase: Phase::Public },
    ToolSpec {
        id: ToolId::Allproxy,
        name: "allproxy",
        prerequisites: &[ToolId::Python313, ToolId::Homebrew],
        phase: Phase::Private,
    },
    ToolSpec { id: ToolId::SpartaPki, name: "Sparta PKI trust roots", prerequisites: &[], phase: Phase::Private },
    ToolSpec {
        id: ToolId::HopsCli,
        name: "hops-cli",
        prerequisites: &[ToolId::Python313, ToolId::SpartaPki],
        phase: Phase::Private,
    },
    ToolSpec {
        id: ToolId::GnocHelper,
        name: "gnoc-helper",
        prerequisites: &[ToolId::PyenvVenvNcpcli, ToolId::Allproxy],
        phase: Phase::Private,
    },
    ToolSpec { id: ToolId::Stencil, name: "stencil", prerequisites: &[ToolId::PyenvVenvNcpcli], phase: Phase::Private },
    ToolSpec { id: ToolId::Silencer, name: "silencer", prerequisites: &[], phase: Phase::Private },
    ToolSpec { id: ToolId::Ncpcli, name: "ncpcli", prerequisites: &[ToolId::PyenvVenvNcpcli], phase: Phase::Private },
    ToolSpec { id: ToolId::JitPass, name: "gnoc-jit-pass", prerequisites: &[], phase: Phase::Private },
];

/// Tools offered (and pre-selected) by default in interactive selection.
pub const BASE_SELECTION: [ToolId; 10] = [
    ToolId::Iterm2,
    ToolId::Xcode,
    ToolId::Homebrew,
    ToolId::Pyenv,
    ToolId::Python313,
    ToolId::Python396,
    ToolId::PyenvVenvNcpcli,
    ToolId::Allproxy,
    ToolId::SpartaPki,
    ToolId::HopsCli,
];

/// Tools that always accompany `gnoc_helper` when it is picked interactively.
pub const GNOC_COMPANIONS: [ToolId; 3] = [ToolId::Stencil, ToolId::Silencer, ToolId::JitPass];

impl ToolId {
    /// Every tool, in catalog order.
    pub const ALL: [ToolId; 15] = [
        ToolId::Xcode,
        ToolId::Homebrew,
        ToolId::Pyenv,
        ToolId::Python313,
        ToolId::Python396,
        ToolId::PyenvVenvNcpcli,
        ToolId::Iterm2,
        ToolId::Allproxy,
        ToolId::SpartaPki,
        ToolId::HopsCli,
        ToolId::GnocHelper,
        ToolId::Stencil,
        ToolId::Silencer,
        ToolId::Ncpcli,
        ToolId::JitPass,
    ];

    /// The key used on the command line and in `state.json`.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolId::Xcode => "xcode",
            ToolId::Homebrew => "homebrew",
            ToolId::Pyenv => "pyenv",
            ToolId::Python313 => "python313",
            ToolId::Python396 => "python396",
            ToolId::PyenvVenvNcpcli => "pyenv_venv_ncpcli",
            ToolId::Iterm2 => "iterm2",
            ToolId::Allproxy => "allproxy",
            ToolId::SpartaPki => "sparta_pki",
            ToolId::HopsCli => "hops_cli",
            ToolId::GnocHelper => "gnoc_helper",
            ToolId::Stencil => "stencil",
            ToolId::Silencer => "silencer",
            ToolId::Ncpcli => "ncpcli",
            ToolId::JitPass => "jit_pass",
        }
    }

    /// Catalog entry for this tool.
    pub fn spec(self) -> &'static ToolSpec {
        // Variant order, `ALL` and `CATALOG` line up; the test module pins that.
        &CATALOG[self as usize]
    }

    pub fn prerequisites(self) -> &'static [ToolId] {
        self.spec().prerequisites
    }

    pub fn phase(self) -> Phase {
        self.spec().phase
    }

    pub fn display_name(self) -> &'static str {
        self.spec().name
    }
}

/// The whole catalog, in order.
pub fn catalog() -> &'static [ToolSpec] {
    &CATALOG
}

impl FromStr for ToolId {
    type Err = String;

    /// Parses a tool key exactly as printed by `--list` (case-sensitive,
    /// surrounding whitespace ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        ToolId::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| format!("unknown tool: {key:?} (use --list)"))
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
