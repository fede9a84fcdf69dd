// Core logic of an onboarding run. Each module owns one concern; the
// `commands` layer wires them together.

// Reads `~/.chs-onboard/config.yaml`, falling back to built-in defaults.
pub mod config_loading;
// Shared per-run context handed to preflight and installers.
pub mod context;
// Background `sudo -v` refresher.
pub mod keepalive;
// Waits for the private network to come up.
pub mod network_gate;
pub mod paths;
// Drives one phase: skip, install, record.
pub mod phase_runner;
pub mod phases;
pub mod preflight;
pub mod prompts;
// Dependency resolution over the tool catalog.
pub mod resolver;
pub mod run_log;
pub mod selection;
pub mod state_management;
pub mod utilities;
