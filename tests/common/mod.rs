//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture for building real local git
//! repositories — meta-repos, submodules, branches, merges — that the
//! conversion tests run against. Everything stays on the local
//! filesystem; no network access is involved.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then:
//!
//! ```rust,ignore
//! mod common;
//! use common::GitFixture;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = GitFixture::new();
//!     let meta = fixture.init_repo("meta", "main");
//!     // ... test code
//! }
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

/// A temporary directory holding fixture repositories.
pub struct GitFixture {
    root: tempfile::TempDir,
}

#[allow(dead_code)]
impl GitFixture {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create fixture tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// A workspace directory inside the fixture (not created).
    pub fn workspace_dir(&self) -> PathBuf {
        self.root.path().join("workspace")
    }

    /// Initialize a repository with a fixed identity and the given
    /// initial branch.
    pub fn init_repo(&self, name: &str, default_branch: &str) -> PathBuf {
        let dir = self.root.path().join(name);
        std::fs::create_dir_all(&dir).expect("create repo dir");
        git(&dir, &["init", "--quiet", "-b", default_branch]);
        git(&dir, &["config", "user.name", "fixture"]);
        git(&dir, &["config", "user.email", "fixture@localhost"]);
        git(&dir, &["config", "commit.gpgsign", "false"]);
        dir
    }

    /// Write a file and commit it.
    pub fn commit_file(&self, repo: &Path, rel: &str, content: &str, message: &str) {
        let file = repo.join(rel);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&file, content).expect("write file");
        git(repo, &["add", rel]);
        git(repo, &["commit", "--quiet", "-m", message]);
    }

    /// Create a branch at HEAD without switching to it.
    pub fn branch(&self, repo: &Path, name: &str) {
        git(repo, &["branch", name]);
    }

    pub fn checkout(&self, repo: &Path, name: &str) {
        git(repo, &["checkout", "--quiet", name]);
    }

    pub fn checkout_new(&self, repo: &Path, name: &str) {
        git(repo, &["checkout", "--quiet", "-b", name]);
    }

    /// Merge `branch` into the current branch with a merge commit.
    pub fn merge_no_ff(&self, repo: &Path, branch: &str, message: &str) {
        git(repo, &["merge", "--quiet", "--no-ff", "-m", message, branch]);
    }

    /// Record `source` as a submodule of `superproject` at `target` and
    /// commit the pin.
    pub fn add_submodule(&self, superproject: &Path, source: &Path, target: &str) {
        let url = source.to_str().expect("utf-8 source path");
        git(
            superproject,
            &[
                "-c",
                "protocol.file.allow=always",
                "submodule",
                "add",
                "--quiet",
                url,
                target,
            ],
        );
        git(superproject, &["commit", "--quiet", "-m", "Add submodule"]);
    }

    pub fn current_sha(&self, repo: &Path) -> String {
        git_out(repo, &["rev-parse", "HEAD"]).trim().to_string()
    }
}

/// Run git in `repo`, panicking with stderr on failure.
#[allow(dead_code)]
pub fn git(repo: &Path, args: &[&str]) {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        repo.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Run git in `repo` and return stdout, panicking on failure.
#[allow(dead_code)]
pub fn git_out(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        repo.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Sorted local branch names of a repository.
#[allow(dead_code)]
pub fn branch_names(repo: &Path) -> Vec<String> {
    let mut names: Vec<String> =
        git_out(repo, &["for-each-ref", "--format=%(refname:short)", "refs/heads"])
            .lines()
            .map(str::to_owned)
            .collect();
    names.sort();
    names
}

/// Tree object id of `rev` (e.g. `main:a` or `feat-x^{tree}`).
#[allow(dead_code)]
pub fn tree_oid(repo: &Path, rev: &str) -> String {
    git_out(repo, &["rev-parse", rev]).trim().to_string()
}

/// Content of a blob at `rev` (e.g. `main:README.md`).
#[allow(dead_code)]
pub fn show_blob(repo: &Path, rev: &str) -> String {
    git_out(repo, &["show", rev])
}
