//! Phase 3: History Synthesis
//!
//! Turns one resolved branch plan into one monorepo branch. Every branch
//! starts from the same empty root commit, imports each first-layer
//! submodule under its target path, and finishes with the meta-repo
//! overlaid at the root so that top-level files win shared paths. The one
//! exception to "meta wins" is a meta-repo blob sitting at or under a
//! submodule's target root: the submodule content is kept and the dropped
//! blob is reported as an override.
//!
//! ## Modes
//!
//! - **Linear**: each repository contributes a single subtree import. Used
//!   whenever the meta branch carries no merge commits relative to its
//!   default branch, when the branch fell back to the default, or when
//!   merge flattening was requested.
//! - **Merge-preserving**: the meta-repo's merge commits (restricted to
//!   commits reachable from the branch but not from the default branch)
//!   are replayed in topological order. Each side-branch parent becomes a
//!   second parent of a monorepo commit: a content-free merge record when
//!   the parent is already in the monorepo ancestry, a root overlay graft
//!   otherwise. A terminal overlay of the branch tip makes the final tree
//!   exact in both cases. Submodule history is always imported linearly;
//!   only the meta-repo's topology is reproduced.
//!
//! ## Failure isolation
//!
//! Any driver failure aborts only the branch being built. The partial
//! head is preserved under `refs/monomaker/failed/<branch>`, the branch
//! name is freed, and synthesis moves on.

use std::path::Path;

use log::{debug, info, warn};

use super::Cancellation;
use crate::error::{Error, Result};
use crate::git::{GitDriver, FAILED_REF_PREFIX, ROOT_TAG};
use crate::path::join_subpath;
use crate::repository::Repository;
use crate::resolver::{BranchPlan, PlanEntry};

/// Knobs for the synthesis phase.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    /// Ignore meta-repo merge topology and always import linearly.
    pub flatten_merges: bool,
}

/// Result of synthesizing one branch.
#[derive(Debug, Clone)]
pub struct BranchOutcome {
    pub commit_sha: String,
    /// Meta-repo blobs dropped in favor of submodule roots.
    pub overridden_paths: Vec<String>,
}

/// Synthesize the monorepo branch for `plan`.
pub fn synthesize_branch(
    driver: &GitDriver,
    monorepo: &Path,
    repos: &[Repository],
    plan: &BranchPlan,
    options: &SynthesisOptions,
    cancel: &Cancellation,
) -> Result<BranchOutcome> {
    driver.create_branch(monorepo, &plan.branch, ROOT_TAG)?;
    if plan.all_fell_back() {
        // Nobody carries this branch; it becomes a default-branch snapshot
        // under the requested name.
        debug!("{} is a default-branch snapshot", plan.branch);
    }

    let submodule_roots: Vec<String> = repos
        .iter()
        .filter(|repo| !repo.is_meta())
        .map(|repo| repo.target_subpath.clone())
        .collect();
    let mut overridden = Vec::new();

    // First-layer submodules in declaration order; the meta-repo comes
    // last so its commit overlays the root.
    for repo in repos.iter().filter(|repo| !repo.is_meta()) {
        cancel.check()?;
        let entry = entry_for(plan, repo)?;
        let message = import_message(&repo.name, &repo.target_subpath, &entry.branch_used);
        let outcome = driver.subtree_add(
            monorepo,
            &repo.local_path,
            &entry.branch_used,
            &repo.target_subpath,
            &[],
            &message,
        )?;
        debug!(
            "imported {} at {} from {} ({})",
            repo.name, repo.target_subpath, entry.branch_used, outcome.commit_sha
        );
    }

    let meta = repos
        .iter()
        .find(|repo| repo.is_meta())
        .ok_or_else(|| Error::Invariant {
            message: "no meta-repo among the participants".to_string(),
        })?;
    cancel.check()?;
    let entry = entry_for(plan, meta)?;

    let meta_merges = if options.flatten_merges || entry.branch_used == meta.default_branch {
        Vec::new()
    } else {
        driver.merge_commits(&meta.local_path, &entry.branch_used, &meta.default_branch)?
    };

    let message = import_message(&meta.name, ".", &entry.branch_used);
    if meta_merges.is_empty() {
        let outcome = driver.subtree_add(
            monorepo,
            &meta.local_path,
            &entry.branch_used,
            ".",
            &submodule_roots,
            &message,
        )?;
        overridden.extend(outcome.overridden_paths);
    } else {
        info!(
            "reproducing {} merge commit(s) of {} on {}",
            meta_merges.len(),
            meta.name,
            plan.branch
        );
        // One fetch of the tip brings every commit the replay references.
        let tip = driver.fetch_ref(monorepo, &meta.local_path, &entry.branch_used)?;
        for merge in &meta_merges {
            debug!("replaying merge {}", merge.sha);
            for side in merge.parents.iter().skip(1) {
                cancel.check()?;
                let merge_message = format!("Reproduce merge of {} from {}", side, meta.name);
                if driver.is_ancestor(monorepo, side, "HEAD")? {
                    driver.merge_ours(monorepo, side, &merge_message)?;
                } else {
                    let outcome =
                        driver.overlay_graft(monorepo, side, &submodule_roots, &merge_message)?;
                    overridden.extend(outcome.overridden_paths);
                }
            }
        }
        cancel.check()?;
        let outcome = driver.overlay_graft(monorepo, &tip, &submodule_roots, &message)?;
        overridden.extend(outcome.overridden_paths);
    }

    // Nested submodules keep their gitlinks from the imported trees; only
    // the root .gitmodules needs re-rooted entries.
    let mut registered = false;
    for repo in repos {
        for nested in &repo.nested_submodules {
            let path = join_subpath(&repo.target_subpath, &nested.path);
            driver.register_submodule(monorepo, &path, &nested.url)?;
            registered = true;
        }
    }
    if registered && driver.index_dirty(monorepo)? {
        driver.commit_index(monorepo, "Record nested submodules")?;
    }

    let commit_sha = driver.current_sha(monorepo)?;
    Ok(BranchOutcome {
        commit_sha,
        overridden_paths: overridden,
    })
}

/// Best-effort recovery after a failed branch: keep the partial head on a
/// scratch ref, free the branch name, and leave HEAD detached at the root
/// so the next branch starts clean.
pub fn preserve_failed(driver: &GitDriver, monorepo: &Path, branch: &str) {
    let head = driver.current_sha(monorepo).ok();
    if let Err(e) = driver.abort_merge(monorepo) {
        warn!("could not abort in-progress merge for {}: {}", branch, e);
    }
    if let Some(sha) = head {
        let failed_ref = format!("{FAILED_REF_PREFIX}/{branch}");
        match driver.update_ref(monorepo, &failed_ref, &sha) {
            Ok(()) => info!("preserved failed branch {} at {}", branch, failed_ref),
            Err(e) => warn!("could not preserve failed branch {}: {}", branch, e),
        }
    }
    if let Err(e) = driver.detach(monorepo, ROOT_TAG) {
        warn!("could not detach from failed branch {}: {}", branch, e);
    }
    if let Err(e) = driver.delete_branch(monorepo, branch) {
        warn!("could not delete failed branch {}: {}", branch, e);
    }
}

fn entry_for<'a>(plan: &'a BranchPlan, repo: &Repository) -> Result<&'a PlanEntry> {
    plan.entry_for(&repo.name).ok_or_else(|| Error::Invariant {
        message: format!("plan for {} has no entry for {}", plan.branch, repo.name),
    })
}

fn import_message(repo: &str, subpath: &str, branch: &str) -> String {
    format!("Import {repo} at {subpath} from {branch}")
}
