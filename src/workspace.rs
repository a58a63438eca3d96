//! # Workspace Management
//!
//! The workspace is the on-disk area a run exclusively owns:
//!
//! ```text
//! <workspace>/
//!   sources/        full local clones of every participating repo
//!   monorepo/       the produced monorepo
//!   report.json     the migration report (location overridable)
//! ```
//!
//! The monorepo and the report are never removed automatically — a failed
//! run leaves them in place for inspection, and an existing workspace is
//! only destroyed on explicit user request (handled by the CLI before
//! `prepare` is called). Source clones are different: they are scoped to
//! the run and released when it completes, successfully or not, through a
//! drop guard. `--keep-on-failure` flips the guard so a non-zero exit
//! keeps the clones next to the refs that reference them.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::path::encode_repo_name;

/// Directory for source clones under the workspace root.
pub const SOURCES_DIR: &str = "sources";
/// Directory for the produced monorepo under the workspace root.
pub const MONOREPO_DIR: &str = "monorepo";
/// Default report file name under the workspace root.
pub const REPORT_FILENAME: &str = "report.json";

/// A prepared workspace.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    report_path: PathBuf,
}

impl Workspace {
    /// Create the workspace layout, failing when the monorepo directory
    /// already has content (the CLI resolves that before calling in).
    pub fn prepare(root: &Path, report_override: Option<&Path>) -> Result<Self> {
        let monorepo = root.join(MONOREPO_DIR);
        if dir_has_entries(&monorepo)? {
            return Err(Error::Workspace {
                message: format!("monorepo directory is not empty: {}", monorepo.display()),
            });
        }
        fs::create_dir_all(root.join(SOURCES_DIR)).map_err(|e| Error::Workspace {
            message: format!("cannot create {}: {}", root.join(SOURCES_DIR).display(), e),
        })?;
        fs::create_dir_all(&monorepo).map_err(|e| Error::Workspace {
            message: format!("cannot create {}: {}", monorepo.display(), e),
        })?;
        let report_path = report_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(REPORT_FILENAME));
        debug!("workspace prepared at {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            report_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join(SOURCES_DIR)
    }

    pub fn monorepo_dir(&self) -> PathBuf {
        self.root.join(MONOREPO_DIR)
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Clone destination for a repository name.
    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.sources_dir().join(encode_repo_name(name))
    }

    /// Scoped guard releasing `sources/` when dropped.
    pub fn sources_guard(&self) -> SourcesGuard {
        SourcesGuard {
            dir: self.sources_dir(),
            keep: Cell::new(false),
        }
    }
}

/// Drop guard for the source clones.
#[derive(Debug)]
pub struct SourcesGuard {
    dir: PathBuf,
    keep: Cell<bool>,
}

impl SourcesGuard {
    /// Retain the clones past the end of the run.
    pub fn keep(&self) {
        self.keep.set(true);
    }
}

impl Drop for SourcesGuard {
    fn drop(&mut self) {
        if self.keep.get() {
            debug!("keeping source clones at {}", self.dir.display());
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove source clones at {}: {}", self.dir.display(), e);
            }
        }
    }
}

/// Whether `dir` exists and contains at least one entry.
pub fn dir_has_entries(dir: &Path) -> Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Workspace {
            message: format!("cannot inspect {}: {}", dir.display(), e),
        }),
    }
}
