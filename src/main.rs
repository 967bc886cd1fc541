//! # known-good CLI
//!
//! Binary entry point for the `known-good` command-line tool.
//!
//! Parses arguments with `clap`, dispatches to the selected subcommand and
//! turns its outcome into a process exit code. Fatal errors are reported as a
//! single `ERROR: ...` diagnostic on stderr.
//!
//! The registry logic itself lives in the `known_good` library crate; the
//! binary only wires arguments, logging and console output to it.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use known_good::exit_codes;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("ERROR: {:#}", error);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}
