//! # Branch Resolver
//!
//! Computes, for every branch that will exist in the monorepo, the per-repo
//! choice between the branch itself and the repo's default branch. The
//! resolver is a pure function of its inputs: no VCS access, no clock, no
//! randomness. Its output order is the synthesis order.
//!
//! Ordering: default branches first (stable by repo declaration order,
//! first occurrence wins), then the remaining branches lexicographically.
//! Default branches are therefore always materialized and always
//! established before any feature branch.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::repository::Repository;

/// The choice made for one repository within one branch plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Repository name.
    pub repo: String,
    /// Branch whose tree will be imported for this repository.
    pub branch_used: String,
    /// True when the repository lacks the plan's branch and fell back to
    /// its default branch.
    pub fell_back: bool,
}

/// The complete per-repo resolution for one monorepo branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchPlan {
    pub branch: String,
    /// One entry per participating repository, in declaration order
    /// (meta-repo first).
    pub entries: Vec<PlanEntry>,
}

impl BranchPlan {
    /// Look up the entry for a repository by name.
    pub fn entry_for(&self, repo: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|entry| entry.repo == repo)
    }

    /// True when every repository fell back to its default branch.
    pub fn all_fell_back(&self) -> bool {
        self.entries.iter().all(|entry| entry.fell_back)
    }
}

/// Output of branch resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Plans in synthesis order.
    pub plans: Vec<BranchPlan>,
    /// Whitelist entries that name no branch in any repository, sorted.
    pub unknown: Vec<String>,
}

/// Resolve the monorepo branch set.
///
/// With a whitelist, the effective set is
/// `(whitelist ∩ all_branches) ∪ defaults`; without one it is the union of
/// all branches. Whitelist entries outside `all_branches` are returned in
/// `unknown` rather than silently dropped.
pub fn resolve(repos: &[Repository], whitelist: Option<&BTreeSet<String>>) -> Resolution {
    let all_branches: BTreeSet<&str> = repos
        .iter()
        .flat_map(|repo| repo.branches.iter().map(String::as_str))
        .collect();

    // Defaults in declaration order, first occurrence wins.
    let mut defaults: Vec<&str> = Vec::new();
    for repo in repos {
        if !defaults.contains(&repo.default_branch.as_str()) {
            defaults.push(&repo.default_branch);
        }
    }

    let (selected, unknown): (BTreeSet<&str>, Vec<String>) = match whitelist {
        Some(requested) => {
            let selected = requested
                .iter()
                .map(String::as_str)
                .filter(|name| all_branches.contains(name))
                .collect();
            let unknown = requested
                .iter()
                .filter(|name| !all_branches.contains(name.as_str()))
                .cloned()
                .collect();
            (selected, unknown)
        }
        None => (all_branches.clone(), Vec::new()),
    };

    // Defaults first in declaration order, then the rest lexicographically
    // (BTreeSet iteration order).
    let mut ordered: Vec<&str> = defaults.clone();
    for &name in &selected {
        if !defaults.contains(&name) {
            ordered.push(name);
        }
    }

    let plans = ordered
        .into_iter()
        .map(|branch| plan_for(repos, branch))
        .collect();

    Resolution { plans, unknown }
}

fn plan_for(repos: &[Repository], branch: &str) -> BranchPlan {
    let entries = repos
        .iter()
        .map(|repo| {
            if repo.has_branch(branch) {
                PlanEntry {
                    repo: repo.name.clone(),
                    branch_used: branch.to_string(),
                    fell_back: false,
                }
            } else {
                PlanEntry {
                    repo: repo.name.clone(),
                    branch_used: repo.default_branch.clone(),
                    fell_back: true,
                }
            }
        })
        .collect();
    BranchPlan {
        branch: branch.to_string(),
        entries,
    }
}

/// Verify a plan against the repositories it was derived from.
///
/// A failure here is a monomaker bug, not bad input: every participating
/// repository must appear exactly once, with `branch_used` consistent with
/// the repository's branch set.
pub fn verify_plan(plan: &BranchPlan, repos: &[Repository]) -> Result<()> {
    if plan.entries.len() != repos.len() {
        return Err(Error::Invariant {
            message: format!(
                "plan for {} has {} entries for {} repositories",
                plan.branch,
                plan.entries.len(),
                repos.len()
            ),
        });
    }
    for repo in repos {
        let entry = plan.entry_for(&repo.name).ok_or_else(|| Error::Invariant {
            message: format!("plan for {} is missing repository {}", plan.branch, repo.name),
        })?;
        let expected_fallback = !repo.has_branch(&plan.branch);
        let consistent = if expected_fallback {
            entry.fell_back && entry.branch_used == repo.default_branch
        } else {
            !entry.fell_back && entry.branch_used == plan.branch
        };
        if !consistent {
            return Err(Error::Invariant {
                message: format!(
                    "plan for {} assigns {} to {} (fell_back={})",
                    plan.branch, entry.branch_used, repo.name, entry.fell_back
                ),
            });
        }
    }
    Ok(())
}
