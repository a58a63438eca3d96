//! Default values for monomaker configuration.
//!
//! This module provides centralized default values used across the CLI,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Directory name used when `--workspace` is not given, created under the
/// current working directory.
pub const DEFAULT_WORKSPACE_DIRNAME: &str = "monomaker-workspace";

/// Worker pool size for parallel discovery when `--workers` is not given.
pub const DEFAULT_WORKERS: usize = 4;

/// Returns the default workspace root.
///
/// The workspace holds the produced monorepo, so it defaults to a visible
/// directory next to where the user invoked the tool rather than a system
/// cache location. This can be overridden by the `--workspace` CLI flag.
pub fn default_workspace_root() -> PathBuf {
    PathBuf::from(DEFAULT_WORKSPACE_DIRNAME)
}
