//! # VCS Driver
//!
//! This module is the only place in monomaker that invokes the external
//! `git` executable. Every operation is a function of a repository path and
//! arguments, returning structured output or a typed error; the driver never
//! retries and never interprets human-readable output. Where git offers a
//! porcelain or format-string form (`for-each-ref --format`, `ls-remote
//! --symref`, `ls-tree`, `rev-list --parents`, `config --get-regexp`), that
//! form is used so the parsing survives git's message-wording changes.
//!
//! ## Determinism
//!
//! When `SOURCE_DATE_EPOCH` is set, every commit-creating invocation exports
//! `GIT_AUTHOR_DATE` and `GIT_COMMITTER_DATE` derived from it, and the
//! monorepo is configured with a fixed committer identity at
//! [`GitDriver::init_monorepo`] time. Together with fixed commit messages
//! this makes repeated runs produce identical commit SHAs.
//!
//! ## Subtree imports
//!
//! `subtree_add` implements the classic subtree-merge recipe (`fetch`,
//! `merge -s ours --no-commit --allow-unrelated-histories`,
//! `read-tree --prefix=<p>/ -u`, `commit`). For the monorepo root the prefix
//! form does not apply; instead the source tree is enumerated with
//! `ls-tree -r` and grafted into the index with `update-index --index-info`,
//! skipping gitlink entries, the source's own `.gitmodules`, and blobs
//! shadowed by an already-imported submodule root (reported back to the
//! caller as overridden paths).

use std::collections::BTreeSet;
use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::path;

/// Tag placed on the shared empty root commit of the monorepo.
pub const ROOT_TAG: &str = "monomaker-root";

/// Ref (outside `refs/heads/`) holding the shared empty root commit.
pub const ROOT_REF: &str = "refs/monomaker/root";

/// Namespace for the preserved heads of failed branch syntheses.
pub const FAILED_REF_PREFIX: &str = "refs/monomaker/failed";

/// One submodule entry of a repository, combining `.gitmodules` config with
/// the gitlink recorded in the tree at the same ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleEntry {
    pub name: String,
    pub path: String,
    pub url: String,
    /// Commit the gitlink pins; `None` when the configured path carries no
    /// gitlink at the inspected ref.
    pub sha: Option<String>,
}

/// A merge commit together with its parent SHAs (first parent first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCommit {
    pub sha: String,
    pub parents: Vec<String>,
}

/// Result of a subtree import.
#[derive(Debug, Clone)]
pub struct SubtreeOutcome {
    pub commit_sha: String,
    /// Source blobs that were skipped because a submodule root shadows them.
    pub overridden_paths: Vec<String>,
}

/// Narrow adapter over the `git` executable.
#[derive(Debug, Clone)]
pub struct GitDriver {
    source_date_epoch: Option<String>,
}

impl Default for GitDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GitDriver {
    /// Create a driver, capturing `SOURCE_DATE_EPOCH` once so that all
    /// commits of a run share the same pinned dates.
    pub fn new() -> Self {
        Self {
            source_date_epoch: std::env::var("SOURCE_DATE_EPOCH").ok(),
        }
    }

    /// Check whether `repo` is the top level of a git working tree.
    ///
    /// Plain `rev-parse --git-dir` would also accept any directory nested
    /// inside some repository (git discovers upward), so the resolved top
    /// level is compared against the path itself.
    pub fn is_repository(&self, repo: &Path) -> bool {
        let Ok(stdout) = self.run(repo, &["rev-parse", "--show-toplevel"]) else {
            return false;
        };
        match (Path::new(stdout.trim()).canonicalize(), repo.canonicalize()) {
            (Ok(toplevel), Ok(given)) => toplevel == given,
            _ => false,
        }
    }

    /// Clone `url` into `dest` with full history and all refs.
    pub fn clone(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        debug!("cloning {} into {}", url, dest_str);
        let output = Command::new("git")
            .args(["clone", "--quiet", url])
            .arg(dest)
            .output()
            .map_err(|e| Error::CloneFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::CloneFailed {
                url: url.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Ensure every `refs/remotes/origin/*` head exists as a local branch.
    pub fn fetch_all_branches(&self, repo: &Path) -> Result<()> {
        let stdout = self.run(
            repo,
            &[
                "for-each-ref",
                "--format=%(refname:short)",
                "refs/remotes/origin",
            ],
        )?;
        let locals = self.list_branches(repo)?;
        for branch in parse_remote_branches(&stdout, "origin") {
            if !locals.contains(&branch) {
                self.run(
                    repo,
                    &["branch", "--track", &branch, &format!("origin/{branch}")],
                )?;
            }
        }
        Ok(())
    }

    /// List local branch heads.
    pub fn list_branches(&self, repo: &Path) -> Result<BTreeSet<String>> {
        let stdout = self.run(
            repo,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        )?;
        Ok(parse_ref_names(&stdout).into_iter().collect())
    }

    /// Determine the default branch from the remote's HEAD pointer.
    ///
    /// Tries the local `refs/remotes/origin/HEAD` symref first (set by
    /// clone), then queries the remote with `ls-remote --symref`.
    pub fn default_branch(&self, repo: &Path, repo_name: &str) -> Result<String> {
        if let Ok(stdout) = self.run(repo, &["symbolic-ref", "refs/remotes/origin/HEAD"]) {
            if let Some(branch) = parse_symbolic_head(&stdout) {
                return Ok(branch);
            }
        }
        let stdout = self
            .run(repo, &["ls-remote", "--symref", "origin", "HEAD"])
            .map_err(|_| Error::NoDefaultBranch {
                repo: repo_name.to_string(),
            })?;
        parse_ls_remote_symref(&stdout).ok_or_else(|| Error::NoDefaultBranch {
            repo: repo_name.to_string(),
        })
    }

    /// List the submodules recorded at `reference`, pairing `.gitmodules`
    /// config entries with the gitlink pinned in the tree.
    pub fn list_submodules(&self, repo: &Path, reference: &str) -> Result<Vec<SubmoduleEntry>> {
        let blob = format!("{reference}:.gitmodules");
        if !self.run_check(repo, &["cat-file", "-e", &blob])? {
            return Ok(Vec::new());
        }
        let stdout = match self.run(
            repo,
            &["config", "--blob", &blob, "--get-regexp", r"^submodule\."],
        ) {
            Ok(stdout) => stdout,
            // Exit code 1 means the file has no matching keys.
            Err(Error::ExecError { exit_code: 1, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut entries = parse_gitmodules_config(&stdout);
        for entry in &mut entries {
            entry.sha = self.gitlink_sha(repo, reference, &entry.path)?;
        }
        Ok(entries)
    }

    /// Read the gitlink SHA at `path` in the tree of `reference`, if any.
    fn gitlink_sha(&self, repo: &Path, reference: &str, path: &str) -> Result<Option<String>> {
        let stdout = self.run(repo, &["ls-tree", reference, "--", path])?;
        Ok(stdout.lines().find_map(|line| {
            let entry = parse_ls_tree_line(line)?;
            (entry.mode == "160000").then_some(entry.sha)
        }))
    }

    /// Check out a ref, forcing the working tree to match.
    pub fn checkout(&self, repo: &Path, reference: &str) -> Result<()> {
        self.run(repo, &["checkout", "--quiet", "--force", reference])
            .map_err(|e| ref_not_found(e, repo, reference))?;
        Ok(())
    }

    /// Create branch `name` at `start_point` and check it out.
    pub fn create_branch(&self, repo: &Path, name: &str, start_point: &str) -> Result<()> {
        self.run(
            repo,
            &["checkout", "--quiet", "--force", "-b", name, start_point],
        )
        .map_err(|e| ref_not_found(e, repo, start_point))?;
        Ok(())
    }

    /// Delete branch `name`, tolerating its absence.
    pub fn delete_branch(&self, repo: &Path, name: &str) -> Result<()> {
        self.run_check(repo, &["branch", "--quiet", "-D", name])?;
        Ok(())
    }

    /// SHA of the current HEAD commit.
    pub fn current_sha(&self, repo: &Path) -> Result<String> {
        Ok(self.run(repo, &["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// Resolve a ref to a commit SHA.
    pub fn rev_parse(&self, repo: &Path, reference: &str) -> Result<String> {
        let stdout = self
            .run(repo, &["rev-parse", "--verify", &format!("{reference}^{{commit}}")])
            .map_err(|e| ref_not_found(e, repo, reference))?;
        Ok(stdout.trim().to_string())
    }

    /// Detach HEAD at `reference`.
    pub fn detach(&self, repo: &Path, reference: &str) -> Result<()> {
        self.run(repo, &["checkout", "--quiet", "--force", "--detach", reference])?;
        Ok(())
    }

    /// Point `reference` (full ref name) at `sha`.
    pub fn update_ref(&self, repo: &Path, reference: &str, sha: &str) -> Result<()> {
        self.run(repo, &["update-ref", reference, sha])?;
        Ok(())
    }

    /// Abort any in-progress merge and force the working tree back to HEAD.
    pub fn abort_merge(&self, repo: &Path) -> Result<()> {
        // merge --abort fails when no merge is in progress; that is fine.
        self.run_check(repo, &["merge", "--abort"])?;
        self.run(repo, &["reset", "--hard", "--quiet", "HEAD"])?;
        Ok(())
    }

    /// Initialize the monorepo: empty repository with a fixed identity, a
    /// shared empty root commit on [`ROOT_REF`] (outside `refs/heads/`, so
    /// it never counts as a branch), tagged [`ROOT_TAG`].
    ///
    /// Returns the root commit SHA.
    pub fn init_monorepo(&self, dest: &Path) -> Result<String> {
        std::fs::create_dir_all(dest)?;
        self.run(dest, &["init", "--quiet"])?;
        self.run(dest, &["config", "user.name", "monomaker"])?;
        self.run(dest, &["config", "user.email", "monomaker@localhost"])?;
        self.run(dest, &["config", "commit.gpgsign", "false"])?;
        self.run(dest, &["symbolic-ref", "HEAD", ROOT_REF])?;
        let sha = self.commit_empty(dest, "monomaker root")?;
        self.tag(dest, ROOT_TAG)?;
        Ok(sha)
    }

    /// Create an empty commit and return its SHA.
    pub fn commit_empty(&self, repo: &Path, message: &str) -> Result<String> {
        self.run_committing(repo, &["commit", "--quiet", "--allow-empty", "-m", message])?;
        self.current_sha(repo)
    }

    /// Commit the staged index. `--allow-empty` covers imports whose
    /// content is already present (the merge parent still matters).
    pub fn commit_index(&self, repo: &Path, message: &str) -> Result<String> {
        self.run_committing(repo, &["commit", "--quiet", "--allow-empty", "-m", message])?;
        self.current_sha(repo)
    }

    /// Create a lightweight tag at HEAD.
    pub fn tag(&self, repo: &Path, name: &str) -> Result<()> {
        self.run(repo, &["tag", name])?;
        Ok(())
    }

    /// Record a merge of `other` without changing content: the new commit
    /// keeps HEAD's tree and has parents (HEAD, other).
    ///
    /// Built on `commit-tree` rather than `merge -s ours` because the
    /// porcelain refuses to create a commit when `other` is already an
    /// ancestor of HEAD, and topology recording must not depend on that.
    pub fn merge_ours(&self, repo: &Path, other: &str, message: &str) -> Result<String> {
        let other_sha = self.rev_parse(repo, other)?;
        let head_sha = self.current_sha(repo)?;
        let sha = self
            .run_committing(
                repo,
                &[
                    "commit-tree",
                    "HEAD^{tree}",
                    "-p",
                    &head_sha,
                    "-p",
                    &other_sha,
                    "-m",
                    message,
                ],
            )?
            .trim()
            .to_string();
        // Tree is unchanged, so the working tree stays consistent.
        self.run(repo, &["update-ref", "HEAD", &sha])?;
        Ok(sha)
    }

    /// Fetch `reference` from a local source repository into this one and
    /// return the fetched commit SHA.
    pub fn fetch_ref(&self, repo: &Path, source: &Path, reference: &str) -> Result<String> {
        let source_str = source.to_string_lossy().into_owned();
        self.run(repo, &["fetch", "--quiet", &source_str, reference])
            .map_err(|e| ref_not_found(e, source, reference))?;
        Ok(self.run(repo, &["rev-parse", "FETCH_HEAD"])?.trim().to_string())
    }

    /// Check whether `ancestor` is an ancestor of `descendant`.
    pub fn is_ancestor(&self, repo: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
        self.run_check(repo, &["merge-base", "--is-ancestor", ancestor, descendant])
    }

    /// Merge commits reachable from `branch` but not `base`, oldest first,
    /// each with its parent SHAs.
    pub fn merge_commits(&self, repo: &Path, branch: &str, base: &str) -> Result<Vec<MergeCommit>> {
        let stdout = self.run(
            repo,
            &[
                "rev-list",
                "--merges",
                "--parents",
                "--topo-order",
                "--reverse",
                branch,
                &format!("^{base}"),
            ],
        )?;
        Ok(parse_rev_list_parents(&stdout))
    }

    /// Import the full history of `reference` from `source` under
    /// `subpath`, producing one merge commit on the current branch.
    ///
    /// `submodule_roots` is consulted only for the root form (`subpath`
    /// of `.`): blobs at or under those paths are skipped and reported as
    /// overridden, and gitlink entries plus the source's own `.gitmodules`
    /// are never imported.
    pub fn subtree_add(
        &self,
        repo: &Path,
        source: &Path,
        reference: &str,
        subpath: &str,
        submodule_roots: &[String],
        message: &str,
    ) -> Result<SubtreeOutcome> {
        let fetched = self.fetch_ref(repo, source, reference)?;
        if subpath == "." {
            self.root_overlay(repo, &fetched, submodule_roots, message)
        } else {
            self.prefixed_import(repo, &fetched, subpath, message)
        }
    }

    /// Graft a fetched commit (already in the object store) onto the
    /// current branch with a root overlay; used by merge-preserving
    /// synthesis for side-branch parents.
    pub fn overlay_graft(
        &self,
        repo: &Path,
        sha: &str,
        submodule_roots: &[String],
        message: &str,
    ) -> Result<SubtreeOutcome> {
        self.root_overlay(repo, sha, submodule_roots, message)
    }

    /// Register a nested submodule in the monorepo's root `.gitmodules`
    /// and stage the file. The gitlink itself arrives with the imported
    /// owner tree.
    pub fn register_submodule(&self, repo: &Path, sub_path: &str, url: &str) -> Result<()> {
        self.run(
            repo,
            &[
                "config",
                "-f",
                ".gitmodules",
                &format!("submodule.{sub_path}.path"),
                sub_path,
            ],
        )?;
        self.run(
            repo,
            &[
                "config",
                "-f",
                ".gitmodules",
                &format!("submodule.{sub_path}.url"),
                url,
            ],
        )?;
        self.run(repo, &["add", ".gitmodules"])?;
        Ok(())
    }

    /// Whether the staged index differs from HEAD.
    pub fn index_dirty(&self, repo: &Path) -> Result<bool> {
        Ok(!self.run_check(repo, &["diff", "--cached", "--quiet", "--exit-code"])?)
    }

    // Import forms

    fn prefixed_import(
        &self,
        repo: &Path,
        sha: &str,
        subpath: &str,
        message: &str,
    ) -> Result<SubtreeOutcome> {
        self.run_committing(
            repo,
            &[
                "merge",
                "--quiet",
                "-s",
                "ours",
                "--no-commit",
                "--allow-unrelated-histories",
                sha,
            ],
        )
        .map_err(|e| merge_failure(e, repo, sha))?;
        self.run(
            repo,
            &["read-tree", &format!("--prefix={subpath}/"), "-u", sha],
        )?;
        let commit_sha = self.commit_index(repo, message)?;
        Ok(SubtreeOutcome {
            commit_sha,
            overridden_paths: Vec::new(),
        })
    }

    /// Overlay the tree of `sha` at the monorepo root.
    ///
    /// The index is rebuilt from scratch: entries under a submodule root
    /// keep their current state (including nested gitlinks), everything
    /// else comes from the source tree. Rebuilding rather than adding is
    /// what makes deletions between successive overlays take effect.
    fn root_overlay(
        &self,
        repo: &Path,
        sha: &str,
        submodule_roots: &[String],
        message: &str,
    ) -> Result<SubtreeOutcome> {
        self.run_committing(
            repo,
            &[
                "merge",
                "--quiet",
                "-s",
                "ours",
                "--no-commit",
                "--allow-unrelated-histories",
                sha,
            ],
        )
        .map_err(|e| merge_failure(e, repo, sha))?;

        let mut index_info = String::new();

        // Keep the already-imported submodule subtrees as they are.
        let current = self.run(repo, &["ls-files", "-s"])?;
        for line in current.lines() {
            let Some(entry) = parse_ls_files_line(line) else {
                continue;
            };
            if submodule_roots
                .iter()
                .any(|root| path::is_under(&entry.path, root))
            {
                index_info.push_str(&format!("{} {} 0\t{}\n", entry.mode, entry.sha, entry.path));
            }
        }

        // Everything else is defined by the source tree, minus gitlinks
        // (stale pins) and the source's own .gitmodules.
        let listing = self.run(repo, &["ls-tree", "-r", sha])?;
        let mut overridden = Vec::new();
        for line in listing.lines() {
            let Some(entry) = parse_ls_tree_line(line) else {
                continue;
            };
            if entry.otype == "commit" {
                trace!("skipping stale gitlink {}", entry.path);
                continue;
            }
            if entry.path == ".gitmodules" {
                continue;
            }
            if submodule_roots
                .iter()
                .any(|root| path::is_under(&entry.path, root))
            {
                overridden.push(entry.path);
                continue;
            }
            index_info.push_str(&format!("{} {} 0\t{}\n", entry.mode, entry.sha, entry.path));
        }

        self.run(repo, &["read-tree", "--empty"])?;
        self.run_with_stdin(repo, &["update-index", "--add", "--index-info"], &index_info)?;
        let commit_sha = self.commit_index(repo, message)?;
        // Sync the working tree so later merges start clean.
        self.run(repo, &["reset", "--hard", "--quiet", "HEAD"])?;
        Ok(SubtreeOutcome {
            commit_sha,
            overridden_paths: overridden,
        })
    }

    // Process plumbing

    fn command(&self, repo: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(repo).args(args);
        cmd
    }

    /// Run git in `repo`, returning stdout on success.
    fn run(&self, repo: &Path, args: &[&str]) -> Result<String> {
        trace!("git -C {} {}", repo.display(), args.join(" "));
        let output = self.command(repo, args).output()?;
        if !output.status.success() {
            return Err(exec_error(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run git and report only whether it exited zero.
    fn run_check(&self, repo: &Path, args: &[&str]) -> Result<bool> {
        let output = self.command(repo, args).output()?;
        Ok(output.status.success())
    }

    /// Run a commit-creating git command with pinned dates when
    /// `SOURCE_DATE_EPOCH` is set.
    fn run_committing(&self, repo: &Path, args: &[&str]) -> Result<String> {
        trace!("git -C {} {}", repo.display(), args.join(" "));
        let mut cmd = self.command(repo, args);
        if let Some(epoch) = &self.source_date_epoch {
            let date = format!("{epoch} +0000");
            cmd.env("GIT_AUTHOR_DATE", &date);
            cmd.env("GIT_COMMITTER_DATE", &date);
        }
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(exec_error(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run git with the given string piped to stdin.
    fn run_with_stdin(&self, repo: &Path, args: &[&str], input: &str) -> Result<String> {
        trace!("git -C {} {} (with stdin)", repo.display(), args.join(" "));
        let mut child = self
            .command(repo, args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        child
            .stdin
            .as_mut()
            .ok_or_else(|| Error::Invariant {
                message: "stdin not captured for git subprocess".to_string(),
            })?
            .write_all(input.as_bytes())?;
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(exec_error(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// One line of `ls-tree` output.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LsTreeEntry {
    mode: String,
    otype: String,
    sha: String,
    path: String,
}

fn exec_error(args: &[&str], output: &std::process::Output) -> Error {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Error::ExecError {
        command: args.first().unwrap_or(&"git").to_string(),
        exit_code: output.status.code().unwrap_or(-1),
        stderr,
    }
}

/// Refine an `ExecError` into `RefNotFound` when stderr indicates a
/// missing ref.
fn ref_not_found(error: Error, repo: &Path, reference: &str) -> Error {
    if let Error::ExecError { stderr, .. } = &error {
        let lowered = stderr.to_lowercase();
        if lowered.contains("couldn't find remote ref")
            || lowered.contains("unknown revision")
            || lowered.contains("bad revision")
            || lowered.contains("did not match any")
            || lowered.contains("needed a single revision")
        {
            return Error::RefNotFound {
                repo: repo.display().to_string(),
                reference: reference.to_string(),
            };
        }
    }
    error
}

/// Refine an `ExecError` into `MergeConflict` when stderr/stdout indicate
/// conflicting content.
fn merge_failure(error: Error, repo: &Path, reference: &str) -> Error {
    if let Error::ExecError { stderr, .. } = &error {
        let lowered = stderr.to_lowercase();
        if lowered.contains("conflict") || lowered.contains("automatic merge failed") {
            return Error::MergeConflict {
                repo: repo.display().to_string(),
                reference: reference.to_string(),
            };
        }
    }
    ref_not_found(error, repo, reference)
}

fn parse_ref_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Extract branch names from `for-each-ref refs/remotes/<remote>` short
/// names, dropping the remote's HEAD pointer.
fn parse_remote_branches(output: &str, remote: &str) -> Vec<String> {
    let prefix = format!("{remote}/");
    parse_ref_names(output)
        .into_iter()
        .filter_map(|name| name.strip_prefix(&prefix).map(str::to_owned))
        .filter(|name| name != "HEAD")
        .collect()
}

/// Parse `symbolic-ref refs/remotes/origin/HEAD` output into a branch name.
fn parse_symbolic_head(output: &str) -> Option<String> {
    let trimmed = output.trim();
    trimmed
        .strip_prefix("refs/remotes/")
        .and_then(|rest| rest.split_once('/'))
        .map(|(_, branch)| branch.to_string())
        .filter(|branch| !branch.is_empty())
}

/// Parse `ls-remote --symref <remote> HEAD` output into a branch name.
fn parse_ls_remote_symref(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.strip_prefix("ref: ")
            .and_then(|symref| symref.split_once('\t'))
            .map(|(ref_path, _)| ref_path)
            .and_then(|ref_path| ref_path.strip_prefix("refs/heads/"))
            .map(str::to_owned)
    })
}

/// Parse `config --get-regexp '^submodule\.'` lines into entries, keeping
/// declaration order.
fn parse_gitmodules_config(output: &str) -> Vec<SubmoduleEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut paths = std::collections::HashMap::new();
    let mut urls = std::collections::HashMap::new();

    for line in output.lines() {
        let Some((key, value)) = line.split_once(' ') else {
            continue;
        };
        let Some(rest) = key.strip_prefix("submodule.") else {
            continue;
        };
        if let Some(name) = rest.strip_suffix(".path") {
            if !order.contains(&name.to_string()) {
                order.push(name.to_string());
            }
            paths.insert(name.to_string(), value.to_string());
        } else if let Some(name) = rest.strip_suffix(".url") {
            if !order.contains(&name.to_string()) {
                order.push(name.to_string());
            }
            urls.insert(name.to_string(), value.to_string());
        }
    }

    order
        .into_iter()
        .filter_map(|name| {
            let path = paths.get(&name)?.clone();
            let url = urls.get(&name)?.clone();
            Some(SubmoduleEntry {
                name,
                path,
                url,
                sha: None,
            })
        })
        .collect()
}

/// One line of `ls-files -s` output.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexEntry {
    mode: String,
    sha: String,
    path: String,
}

/// Parse one `ls-files -s` line: `<mode> SP <sha> SP <stage> TAB <path>`.
fn parse_ls_files_line(line: &str) -> Option<IndexEntry> {
    let (meta, path) = line.split_once('\t')?;
    let mut fields = meta.split_whitespace();
    let mode = fields.next()?.to_string();
    let sha = fields.next()?.to_string();
    let _stage = fields.next()?;
    Some(IndexEntry {
        mode,
        sha,
        path: path.to_string(),
    })
}

/// Parse one `ls-tree` line: `<mode> SP <type> SP <sha> TAB <path>`.
fn parse_ls_tree_line(line: &str) -> Option<LsTreeEntry> {
    let (meta, path) = line.split_once('\t')?;
    let mut fields = meta.split_whitespace();
    let mode = fields.next()?.to_string();
    let otype = fields.next()?.to_string();
    let sha = fields.next()?.to_string();
    Some(LsTreeEntry {
        mode,
        otype,
        sha,
        path: path.to_string(),
    })
}

/// Parse `rev-list --parents` output: each line is a SHA followed by its
/// parent SHAs.
fn parse_rev_list_parents(output: &str) -> Vec<MergeCommit> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace().map(str::to_owned);
            let sha = fields.next()?;
            let parents: Vec<String> = fields.collect();
            Some(MergeCommit { sha, parents })
        })
        .collect()
}
