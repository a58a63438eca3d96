//! # Repository Model
//!
//! In-memory description of one participating repository, constructed by
//! the discovery phase from VCS Driver output and immutable afterwards.
//! The meta-repo is the repository whose `target_subpath` is the monorepo
//! root (`.`); every other participant is a first-layer submodule whose
//! `target_subpath` is the path recorded in the meta-repo's submodule
//! configuration.
//!
//! Two repositories are equal when their names are equal; names are unique
//! within a run (enforced during discovery).

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A second-layer submodule, preserved verbatim from its owning
/// first-layer repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedSubmodule {
    /// Path relative to the owning repository's root.
    pub path: String,
    pub url: String,
    /// Commit the owner's gitlink pins.
    pub sha: String,
}

/// One participating repository.
#[derive(Debug, Clone)]
pub struct Repository {
    /// Unique name within the run (meta-repo directory name or submodule
    /// name from `.gitmodules`).
    pub name: String,
    /// Full local clone under the workspace's `sources/` directory.
    pub local_path: PathBuf,
    /// Branch the remote's HEAD designates.
    pub default_branch: String,
    /// All branch heads, sorted.
    pub branches: BTreeSet<String>,
    /// Second-layer submodules recorded by this repository.
    pub nested_submodules: Vec<NestedSubmodule>,
    /// Path under the monorepo root where this repository's tree lives;
    /// `.` for the meta-repo.
    pub target_subpath: String,
}

impl Repository {
    /// Build a repository model, enforcing `default_branch ∈ branches`.
    ///
    /// A violation means branch materialization missed the branch the
    /// remote's HEAD points at, which is a bug rather than bad input.
    pub fn new(
        name: String,
        local_path: PathBuf,
        default_branch: String,
        branches: BTreeSet<String>,
        nested_submodules: Vec<NestedSubmodule>,
        target_subpath: String,
    ) -> Result<Self> {
        if !branches.contains(&default_branch) {
            return Err(Error::Invariant {
                message: format!(
                    "default branch {default_branch} of {name} is not among its branch heads"
                ),
            });
        }
        Ok(Self {
            name,
            local_path,
            default_branch,
            branches,
            nested_submodules,
            target_subpath,
        })
    }

    /// Whether this repository is the meta-repo (lives at the monorepo root).
    pub fn is_meta(&self) -> bool {
        self.target_subpath == "."
    }

    /// Whether this repository has a branch head named `branch`.
    pub fn has_branch(&self, branch: &str) -> bool {
        self.branches.contains(branch)
    }
}

impl PartialEq for Repository {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Repository {}
