use clap::Parser;
use std::process::ExitCode;

use pixelpad::{cli, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    logger::set_echo(args.verbose);
    let log_path = args.log_file.clone().unwrap_or_else(logger::default_path);
    if let Err(e) = logger::init(&log_path) {
        eprintln!("warning: cannot open log file {}: {}", log_path.display(), e);
    }

    cli::run(args)
}
