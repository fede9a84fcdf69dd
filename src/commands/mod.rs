// Register application actions.

// Prints the tool catalog (`--list`).
pub mod list;
// Orchestrates preflight and the three install phases.
pub mod run;
