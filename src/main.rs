//! dupsweep - Staged Duplicate File Finder
//!
//! Entry point for the dupsweep CLI application.

use clap::Parser;
use dupsweep::{cli::Cli, error::ExitCode};

fn main() {
    let cli = Cli::parse();

    match dupsweep::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    }
}
