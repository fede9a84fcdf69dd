// Small building blocks shared by preflight and the installers.

// Declare the `exec` module: the single place external commands are spawned.
pub mod exec;
// Clone-or-pull for internal repositories.
pub mod git;
// Idempotency guards: marker checks and append-once blocks.
pub mod guards;
// Declare the `path_helpers` module.
pub mod path_helpers;
pub mod timestamps;
