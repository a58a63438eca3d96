//! # CLI Argument Parsing and Dispatch
//!
//! This module defines the command-line interface for the `monomaker` tool
//! using the `clap` library. It is responsible for:
//!
//! - Defining the CLI surface, including output control arguments like
//!   `--color` and `--log-level`.
//! - Parsing the command-line arguments provided by the user.
//! - Initializing the logger before any work starts.
//! - Dispatching to the conversion command (or emitting a completion
//!   script when `--completions` is given).
//!
//! Monomaker is a single-purpose tool, so the surface is flat: the
//! meta-repo path is the one positional argument and everything else is a
//! flag. Usage errors are handled by clap and exit with code 2.

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser};
use log::LevelFilter;

use monomaker::exit_codes;
use monomaker::output::OutputConfig;

use crate::commands;

/// Monomaker - Convert a meta-repository with submodules into a monorepo
#[derive(Parser, Debug)]
#[command(name = "monomaker")]
#[command(
    version,
    about,
    long_about = "Monomaker - Convert a meta-repository whose children are submodules \
                  into a single monorepo, preserving the history of every branch that matters"
)]
pub struct Cli {
    #[command(flatten)]
    convert: commands::convert::ConvertArgs,

    /// Generate a shell completion script and exit
    #[arg(long, value_name = "SHELL", value_enum)]
    completions: Option<clap_complete::Shell>,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Increase output verbosity (can be repeated: --verbose --verbose)
    ///
    /// Overrides --log-level when specified:
    ///   --verbose          = debug level
    ///   --verbose --verbose = trace level
    #[arg(long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Suppress output except errors
    ///
    /// Overrides --log-level to show only error messages.
    /// Use for scripting or quiet operation.
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Execute the parsed CLI invocation, returning the process exit code.
    pub fn execute(self) -> Result<i32> {
        self.init_logger()?;

        if let Some(shell) = self.completions {
            let mut command = Self::command();
            clap_complete::generate(shell, &mut command, "monomaker", &mut std::io::stdout());
            return Ok(exit_codes::SUCCESS);
        }

        let output = OutputConfig::from_env_and_flag(&self.color.to_lowercase());
        let show_progress = !self.quiet
            && console::Term::stderr().features().is_attended();

        commands::convert::execute(self.convert, &output, show_progress)
    }

    /// Initialize the logger with the specified log level and color settings
    fn init_logger(&self) -> Result<()> {
        let log_level = self.parse_log_level()?;
        let use_color = self.should_use_color();

        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .write_style(if use_color {
                env_logger::WriteStyle::Auto
            } else {
                env_logger::WriteStyle::Never
            })
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

        Ok(())
    }

    /// Parse the log level, considering --verbose and --quiet flags
    ///
    /// Priority order:
    /// 1. --quiet (always sets to Error level)
    /// 2. --verbose (sets Debug for 1, Trace for 2+)
    /// 3. --log-level (explicit level)
    fn parse_log_level(&self) -> Result<LevelFilter> {
        // --quiet takes precedence: minimal output
        if self.quiet {
            return Ok(LevelFilter::Error);
        }

        // --verbose overrides --log-level
        if self.verbose > 0 {
            return Ok(match self.verbose {
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace, // 2+ means trace
            });
        }

        // Fall back to explicit --log-level
        match self.log_level.to_lowercase().as_str() {
            "error" => Ok(LevelFilter::Error),
            "warn" => Ok(LevelFilter::Warn),
            "info" => Ok(LevelFilter::Info),
            "debug" => Ok(LevelFilter::Debug),
            "trace" => Ok(LevelFilter::Trace),
            "off" => Ok(LevelFilter::Off),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: '{}'. Valid options are: error, warn, info, debug, trace, off",
                self.log_level
            )),
        }
    }

    /// Determine whether to use color output based on the color setting
    fn should_use_color(&self) -> bool {
        match self.color.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            "auto" => console::Term::stderr().features().colors_supported(),
            _ => {
                // Default to auto if invalid value provided
                eprintln!(
                    "Warning: Invalid color option '{}', using 'auto'. Valid options are: always, never, auto",
                    self.color
                );
                console::Term::stderr().features().colors_supported()
            }
        }
    }
}
