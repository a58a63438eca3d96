//! # Output Configuration
//!
//! Utilities for controlling CLI output appearance, including color and
//! emoji support based on terminal capabilities and user preferences.
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// - `--color=always`: force colors on (overrides NO_COLOR)
    /// - `--color=never`: force colors off
    /// - `--color=auto`: detect based on environment and terminal
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").as_deref() == Ok("0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").as_deref() == Ok("1") {
            return true;
        }
        if env::var("TERM").as_deref() == Ok("dumb") {
            return false;
        }
        console::Term::stderr().features().colors_supported()
    }
}

/// Pick the emoji or its plain-text fallback depending on the output
/// configuration.
pub fn emoji<'a>(config: &OutputConfig, symbol: &'a str, fallback: &'a str) -> &'a str {
    if config.use_color {
        symbol
    } else {
        fallback
    }
}
