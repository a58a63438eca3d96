//! Phase 1: Discovery and Cloning
//!
//! Materializes local clones of the meta-repo and every first-layer
//! submodule under the workspace's `sources/` directory and builds the
//! immutable repository models the resolver and synthesizer work from.
//!
//! ## Process
//!
//! 1. The meta-repo is cloned first, all its remote branches are
//!    materialized as local heads, and its submodule configuration is read
//!    at the default branch. This yields the participant list.
//! 2. First-layer submodules are cloned in parallel on a bounded worker
//!    pool. Each worker owns its own clone directory, so the phase needs
//!    no locking. Submodule URLs starting with `./` or `../` are resolved
//!    against the meta-repo source path, the way git resolves them against
//!    the superproject remote.
//! 3. Nested (second-layer) submodules are enumerated at each first-layer
//!    repo's default branch and recorded verbatim; they stay submodules in
//!    the monorepo.
//! 4. Target paths are validated and checked for collisions before any
//!    synthesis starts: two first-layer repos sharing a target, a nested
//!    submodule re-rooting onto another repo's target, or two nested
//!    submodules re-rooting onto the same path are all fatal.
//!
//! This phase is the only mutator of the source clones; once it returns,
//! synthesis only reads them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use super::Cancellation;
use crate::error::{Error, Result};
use crate::git::{GitDriver, SubmoduleEntry};
use crate::path::{join_subpath, normalize_subpath};
use crate::report::MigrationReport;
use crate::repository::{NestedSubmodule, Repository};
use crate::workspace::Workspace;

/// Execute discovery: clone everything, build models, record
/// `RepoDiscovered` for each participant (meta-repo first).
pub fn execute(
    driver: &GitDriver,
    workspace: &Workspace,
    meta_path: &Path,
    workers: usize,
    report: &mut MigrationReport,
    cancel: &Cancellation,
) -> Result<Vec<Repository>> {
    cancel.check()?;

    let meta_source = meta_path.canonicalize().map_err(|_| Error::BadPath {
        path: meta_path.to_path_buf(),
    })?;
    if !driver.is_repository(&meta_source) {
        return Err(Error::NotARepo { path: meta_source });
    }

    let meta = discover_meta(driver, workspace, &meta_source)?;
    let submodules = driver
        .list_submodules(&meta.local_path, &meta.default_branch)
        .map_err(|e| Error::BranchEnumerationFailed {
            repo: meta.name.clone(),
            message: e.to_string(),
        })?;
    info!(
        "discovered {} first-layer submodule(s) in {}",
        submodules.len(),
        meta.name
    );

    let participants = plan_participants(&meta.name, &meta_source, &submodules)?;
    cancel.check()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::Workspace {
            message: format!("cannot build worker pool: {e}"),
        })?;
    let discovered: Vec<Repository> = pool.install(|| {
        participants
            .par_iter()
            .map(|participant| discover_submodule(driver, workspace, participant, cancel))
            .collect::<Result<Vec<_>>>()
    })?;

    let mut repos = Vec::with_capacity(discovered.len() + 1);
    repos.push(meta);
    repos.extend(discovered);

    check_path_collisions(&repos)?;

    for repo in &repos {
        report.record_repo(repo);
    }
    Ok(repos)
}

/// One submodule participant, validated and ready to clone.
#[derive(Debug, Clone)]
struct Participant {
    name: String,
    target_subpath: String,
    url: String,
}

fn discover_meta(driver: &GitDriver, workspace: &Workspace, meta_source: &Path) -> Result<Repository> {
    let basename = meta_source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "meta".to_string());
    let dest = workspace.source_dir(&basename);
    let url = meta_source.to_string_lossy().into_owned();

    driver.clone(&url, &dest)?;
    driver.fetch_all_branches(&dest).map_err(|e| Error::BranchEnumerationFailed {
        repo: basename.clone(),
        message: e.to_string(),
    })?;
    let default_branch = driver.default_branch(&dest, &basename)?;
    let branches = driver
        .list_branches(&dest)
        .map_err(|e| Error::BranchEnumerationFailed {
            repo: basename.clone(),
            message: e.to_string(),
        })?;
    // A remote HEAD pointing at a branch that has no head (e.g. unborn)
    // means there is no usable default.
    if !branches.contains(&default_branch) {
        return Err(Error::NoDefaultBranch { repo: basename });
    }
    driver.checkout(&dest, &default_branch)?;
    debug!(
        "meta-repo {} default branch {} with {} branch head(s)",
        basename,
        default_branch,
        branches.len()
    );

    Repository::new(basename, dest, default_branch, branches, Vec::new(), ".".to_string())
}

/// Validate submodule entries into participants: normalized unique target
/// paths, unique names, unique clone directories, resolved URLs.
fn plan_participants(
    meta_name: &str,
    meta_source: &Path,
    submodules: &[SubmoduleEntry],
) -> Result<Vec<Participant>> {
    let mut by_target: BTreeMap<String, String> = BTreeMap::new();
    let mut by_clone_dir: BTreeMap<PathBuf, String> = BTreeMap::new();
    by_clone_dir.insert(
        PathBuf::from(crate::path::encode_repo_name(meta_name)),
        meta_name.to_string(),
    );
    let mut participants = Vec::with_capacity(submodules.len());

    for entry in submodules {
        let target_subpath = normalize_subpath(&entry.path)?;
        if target_subpath == "." {
            return Err(Error::PathCollision {
                path: ".".to_string(),
                first: meta_name.to_string(),
                second: entry.name.clone(),
            });
        }
        if entry.name == meta_name {
            return Err(Error::PathCollision {
                path: format!("sources/{}", entry.name),
                first: meta_name.to_string(),
                second: entry.name.clone(),
            });
        }
        if let Some(previous) = by_target.insert(target_subpath.clone(), entry.name.clone()) {
            return Err(Error::PathCollision {
                path: target_subpath,
                first: previous,
                second: entry.name.clone(),
            });
        }
        let clone_dir = PathBuf::from(crate::path::encode_repo_name(&entry.name));
        if let Some(previous) = by_clone_dir.insert(clone_dir.clone(), entry.name.clone()) {
            return Err(Error::PathCollision {
                path: format!("sources/{}", clone_dir.display()),
                first: previous,
                second: entry.name.clone(),
            });
        }
        participants.push(Participant {
            name: entry.name.clone(),
            target_subpath,
            url: resolve_submodule_url(meta_source, &entry.url),
        });
    }
    Ok(participants)
}

fn discover_submodule(
    driver: &GitDriver,
    workspace: &Workspace,
    participant: &Participant,
    cancel: &Cancellation,
) -> Result<Repository> {
    cancel.check()?;

    let dest = workspace.source_dir(&participant.name);
    driver.clone(&participant.url, &dest)?;
    driver
        .fetch_all_branches(&dest)
        .map_err(|e| Error::BranchEnumerationFailed {
            repo: participant.name.clone(),
            message: e.to_string(),
        })?;
    let default_branch = driver.default_branch(&dest, &participant.name)?;
    let branches = driver
        .list_branches(&dest)
        .map_err(|e| Error::BranchEnumerationFailed {
            repo: participant.name.clone(),
            message: e.to_string(),
        })?;
    if !branches.contains(&default_branch) {
        return Err(Error::NoDefaultBranch {
            repo: participant.name.clone(),
        });
    }

    let nested = driver
        .list_submodules(&dest, &default_branch)?
        .into_iter()
        .filter_map(|entry| match entry.sha {
            Some(sha) => Some(NestedSubmodule {
                path: entry.path,
                url: entry.url,
                sha,
            }),
            None => {
                warn!(
                    "submodule {} configures {} without a pinned commit; ignoring",
                    participant.name, entry.path
                );
                None
            }
        })
        .collect();

    debug!(
        "submodule {} default branch {} with {} branch head(s)",
        participant.name,
        default_branch,
        branches.len()
    );
    Repository::new(
        participant.name.clone(),
        dest,
        default_branch,
        branches,
        nested,
        participant.target_subpath.clone(),
    )
}

/// Resolve a `.gitmodules` URL. `./` and `../` URLs are relative to the
/// superproject remote, which for a local conversion is the meta-repo
/// source path.
fn resolve_submodule_url(meta_source: &Path, url: &str) -> String {
    if url.starts_with("./") || url.starts_with("../") {
        let joined = meta_source.join(url);
        joined
            .canonicalize()
            .unwrap_or(joined)
            .to_string_lossy()
            .into_owned()
    } else {
        url.to_string()
    }
}

/// Fatal collision checks across first-layer targets and re-rooted nested
/// submodule paths.
fn check_path_collisions(repos: &[Repository]) -> Result<()> {
    let mut claims: BTreeMap<String, String> = BTreeMap::new();
    for repo in repos {
        if !repo.is_meta() {
            claims.insert(repo.target_subpath.clone(), repo.name.clone());
        }
    }
    for repo in repos {
        for nested in &repo.nested_submodules {
            let path = join_subpath(&repo.target_subpath, &nested.path);
            let claimant = format!("{}:{}", repo.name, nested.path);
            if let Some(previous) = claims.insert(path.clone(), claimant.clone()) {
                // A nested submodule landing on its own owner's root is
                // impossible; anything colliding here is a real conflict.
                return Err(Error::PathCollision {
                    path,
                    first: previous,
                    second: claimant,
                });
            }
        }
    }
    Ok(())
}
