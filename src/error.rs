//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `monomaker` application. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! The taxonomy mirrors the way errors are acted upon:
//!
//! - **Input errors** (`BadPath`, `NotARepo`, `BadWhitelist`): reported
//!   before any workspace write; the run never starts.
//! - **Discovery errors** (`CloneFailed`, `BranchEnumerationFailed`,
//!   `NoDefaultBranch`, `PathCollision`, `Workspace`): fatal; the report is
//!   still written.
//! - **Synthesis errors** (`RefNotFound`, `MergeConflict`, `ExecError`):
//!   scoped to the branch being synthesized; recorded and skipped past.
//! - **Invariant violations** (`Invariant`): indicate a bug in monomaker
//!   itself and surface through a distinct exit code.
//! - **`Cancelled`**: cooperative shutdown requested by a signal.
//!
//! The `exit_code` method maps each variant onto the process exit codes
//! declared in [`crate::exit_codes`].

use std::path::PathBuf;

use thiserror::Error;

use crate::exit_codes;

/// Main error type for monomaker operations
#[derive(Error, Debug)]
pub enum Error {
    /// A path given on the command line does not exist.
    #[error("Path does not exist: {path}")]
    BadPath { path: PathBuf },

    /// The meta-repo path exists but is not a git repository.
    #[error("Not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// The branch whitelist file is missing, unreadable, or malformed.
    #[error("Invalid branch whitelist: {message}")]
    BadWhitelist { message: String },

    /// Cloning a participating repository failed during discovery.
    #[error("Clone failed for {url}: {message}")]
    CloneFailed { url: String, message: String },

    /// Listing branches of a participating repository failed.
    #[error("Branch enumeration failed for {repo}: {message}")]
    BranchEnumerationFailed { repo: String, message: String },

    /// A repository's remote does not designate a default branch.
    #[error("No default branch discoverable for {repo}")]
    NoDefaultBranch { repo: String },

    /// Two repositories (or two nested submodules) claim the same path in
    /// the monorepo tree.
    #[error("Path collision at {path}: claimed by {first} and {second}")]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },

    /// The workspace directory cannot be prepared or written.
    #[error("Workspace unusable: {message}")]
    Workspace { message: String },

    /// A ref named during synthesis does not exist in the repository.
    #[error("Ref not found in {repo}: {reference}")]
    RefNotFound { repo: String, reference: String },

    /// A merge performed during synthesis produced conflicts.
    #[error("Merge conflict in {repo} while merging {reference}")]
    MergeConflict { repo: String, reference: String },

    /// The git executable exited non-zero for a reason not covered by a
    /// more specific variant.
    #[error("git {command} exited with code {exit_code}: {stderr}")]
    ExecError {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// An internal consistency check failed. This is a bug in monomaker.
    #[error("Invariant violated: {message}")]
    Invariant { message: String },

    /// The run was cancelled by a signal.
    #[error("Run cancelled")]
    Cancelled,

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Map this error onto the process exit code it warrants when it
    /// escapes to the top of the program.
    ///
    /// Synthesis-scoped errors normally never reach the top (they are
    /// recorded per branch); when one does, the run is treated as fatal.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::BadPath { .. } | Error::BadWhitelist { .. } => exit_codes::USAGE,
            Error::NotARepo { .. }
            | Error::CloneFailed { .. }
            | Error::BranchEnumerationFailed { .. }
            | Error::NoDefaultBranch { .. }
            | Error::PathCollision { .. }
            | Error::Workspace { .. }
            | Error::RefNotFound { .. }
            | Error::MergeConflict { .. }
            | Error::ExecError { .. }
            | Error::Io(_)
            | Error::Json(_) => exit_codes::FATAL,
            Error::Invariant { .. } => exit_codes::INVARIANT,
            Error::Cancelled => exit_codes::CANCELLED,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
