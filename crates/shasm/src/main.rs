//! CLI entry point for the shasm assembler binary.

use std::process::ExitCode;

use clap::Parser;
use shasm::cli::{init_logging, run, Args};
use thiserror as _;
use tracing as _;
use tracing_subscriber as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.format_for_stderr());
            ExitCode::FAILURE
        }
    }
}
