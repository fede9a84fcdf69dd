// Command-line surface of `chs-onboard`.

// Flag definitions parsed with `clap`.
pub mod args;
