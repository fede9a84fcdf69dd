mod cli;
mod commands;
mod installers;
mod libs;
mod logger;
mod schemas;

use std::process::ExitCode;

use clap::Parser;

use cli::args::Cli;
use commands::{list, run};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.debug);
    log_debug!("[CLI] parsed arguments: {:?}", cli);

    if cli.list {
        list::run();
        return ExitCode::SUCCESS;
    }
    run::run(cli)
}
