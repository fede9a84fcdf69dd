// Data shapes: the tool catalog, persisted state, configuration and log records.

pub mod log_record;
pub mod onboard_config;
pub mod state_file;
// The fixed tool catalog and its dependency edges.
pub mod tools;
