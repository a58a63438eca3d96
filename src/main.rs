//! # Monomaker CLI
//!
//! This is the binary entry point for the `monomaker` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Running the conversion and translating its outcome into the
//!   documented process exit codes.
//!
//! The core application logic is defined in the `lib.rs` library crate,
//! ensuring that the binary is a thin wrapper around the reusable library
//! functionality.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let code = cli.execute()?;
    std::process::exit(code);
}
