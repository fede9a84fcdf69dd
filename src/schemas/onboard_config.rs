//! # Onboarding Configuration (`config.yaml`)
//!
//! Optional YAML file that overrides the network and repository endpoints the
//! onboarding run talks to. Every field has a default matching the standard
//! corporate environment, so the file only needs the keys being changed:
//!
//! ```yaml
//! private_endpoints:
//!   - artifactory.example.internal:443
//! vpn_poll_interval_secs: 10
//! ```
//!
//! Lookup order: `--config <path>`, `$CHS_ONBOARD_CONFIG`, then
//! `~/.chs-onboard/config.yaml`. A missing file means "all defaults".

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OnboardConfig {
    /// `host:port` pairs that must all accept a TCP connection before the
    /// private-network phase may start.
    pub private_endpoints: Vec<String>,
    /// Pause between two polling rounds of the network gate.
    pub vpn_poll_interval_secs: u64,
    /// Per-endpoint connect timeout of the network gate.
    pub vpn_probe_timeout_secs: u64,
    /// URL probed with an HTTP HEAD to confirm public internet access.
    pub public_check_url: String,
    pub public_check_timeout_secs: u64,
    /// How often cached sudo credentials are refreshed during a run.
    pub sudo_keepalive_secs: u64,
    /// Base of every internal git remote, e.g. `ssh://git@host:7999`.
    pub git_remote_base: String,
    /// Internal Python package index (simple API).
    pub package_index_url: String,
    /// Page where the operator registers an SSH public key.
    pub ssh_keys_url: String,
}

impl Default for OnboardConfig {
    fn default() -> Self {
        Self {
            private_endpoints: vec![
                "artifactory.oci.oraclecorp.com:443".to_string(),
                "bitbucket.oci.oraclecorp.com:7999".to_string(),
            ],
            vpn_poll_interval_secs: 5,
            vpn_probe_timeout_secs: 3,
            public_check_url: "https://github.com".to_string(),
            public_check_timeout_secs: 5,
            sudo_keepalive_secs: 60,
            git_remote_base: "ssh://git@bitbucket.oci.oraclecorp.com:7999".to_string(),
            package_index_url: "https://artifactory.oci.oraclecorp.com/api/pypi/global-release-pypi/simple"
                .to_string(),
            ssh_keys_url: "https://bitbucket.oci.oraclecorp.com/plugins/servlet/ssh/account/keys".to_string(),
        }
    }
}

impl OnboardConfig {
    pub fn vpn_poll_interval(&self) -> Duration {
        Duration::from_secs(self.vpn_poll_interval_secs)
    }

    pub fn vpn_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.vpn_probe_timeout_secs)
    }

    pub fn public_check_timeout(&self) -> Duration {
        Duration::from_secs(self.public_check_timeout_secs)
    }

    pub fn sudo_keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.sudo_keepalive_secs)
    }

    /// Full remote URL for a repository path such as `gnoc/gnoc-helper.git`.
    pub fn git_remote(&self, repo_path: &str) -> String {
        format!("{}/{}", self.git_remote_base.trim_end_matches('/'), repo_path)
    }

    /// Host part of the package index URL, passed to pip as `--trusted-host`.
    pub fn package_index_host(&self) -> &str {
        let without_scheme = self
            .package_index_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.package_index_url);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}
