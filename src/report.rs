//! # Migration Report
//!
//! Append-only structured record of everything a run discovered and
//! decided: repository state, the applied whitelist, per-branch resolution
//! plans, and per-branch outcomes. The report is the run's verifiable
//! artifact; tests and downstream tooling diff it, so serialization is
//! stable: fields appear in declaration order, lists preserve append order,
//! and the output is pretty-printed UTF-8 JSON with a trailing newline.
//!
//! Appends are sequenced by the orchestrator, so no internal locking is
//! needed. The report is written on every exit path once the workspace
//! exists; a report without a `finished_at` value (or with an empty
//! `outcomes` list) still deserializes.
//!
//! Timestamps honor `SOURCE_DATE_EPOCH` so that two runs over identical
//! inputs produce byte-identical reports.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::repository::{NestedSubmodule, Repository};
use crate::resolver::{BranchPlan, PlanEntry};

/// Report schema version.
pub const REPORT_VERSION: u32 = 1;

/// Discovered state of one participating repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDiscovered {
    pub name: String,
    pub default_branch: String,
    pub branches: Vec<String>,
    pub nested_submodules: Vec<NestedSubmodule>,
    pub target_subpath: String,
}

/// The requested whitelist and the effective branch set derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistApplied {
    pub requested: Vec<String>,
    pub effective: Vec<String>,
}

/// One resolved branch with its per-repo plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchResolved {
    pub branch: String,
    pub plan: Vec<PlanEntry>,
}

/// Per-step outcome records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Outcome {
    /// A monorepo branch was fully synthesized.
    BranchSynthesized { branch: String, commit_sha: String },
    /// A branch was never attempted, with the reason.
    Skip { branch: String, reason: String },
    /// A step failed; `step` names the branch or the phase.
    Failure { step: String, detail: String },
    /// A meta-repo blob was shadowed by a submodule root and dropped.
    PathOverride { branch: String, path: String },
}

/// The report itself. Field order here is the serialization order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    version: u32,
    started_at: String,
    finished_at: Option<String>,
    whitelist: Option<WhitelistApplied>,
    repos: Vec<RepoDiscovered>,
    resolutions: Vec<BranchResolved>,
    outcomes: Vec<Outcome>,
}

impl Default for MigrationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationReport {
    /// Start a new report stamped with the current time.
    pub fn new() -> Self {
        Self {
            version: REPORT_VERSION,
            started_at: now_rfc3339(),
            finished_at: None,
            whitelist: None,
            repos: Vec::new(),
            resolutions: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Record the discovered state of a repository.
    pub fn record_repo(&mut self, repo: &Repository) {
        self.repos.push(RepoDiscovered {
            name: repo.name.clone(),
            default_branch: repo.default_branch.clone(),
            branches: repo.branches.iter().cloned().collect(),
            nested_submodules: repo.nested_submodules.clone(),
            target_subpath: repo.target_subpath.clone(),
        });
    }

    /// Record the whitelist as requested and the effective set derived
    /// from it.
    pub fn record_whitelist(&mut self, requested: &BTreeSet<String>, effective: &[String]) {
        self.whitelist = Some(WhitelistApplied {
            requested: requested.iter().cloned().collect(),
            effective: effective.to_vec(),
        });
    }

    /// Record one resolved branch plan.
    pub fn record_resolved(&mut self, plan: &BranchPlan) {
        self.resolutions.push(BranchResolved {
            branch: plan.branch.clone(),
            plan: plan.entries.clone(),
        });
    }

    /// Record a successfully synthesized branch.
    pub fn record_synthesized(&mut self, branch: &str, commit_sha: &str) {
        self.outcomes.push(Outcome::BranchSynthesized {
            branch: branch.to_string(),
            commit_sha: commit_sha.to_string(),
        });
    }

    /// Record a branch that was never attempted.
    pub fn record_skip(&mut self, branch: &str, reason: &str) {
        self.outcomes.push(Outcome::Skip {
            branch: branch.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Record a failed step.
    pub fn record_failure(&mut self, step: &str, detail: &str) {
        self.outcomes.push(Outcome::Failure {
            step: step.to_string(),
            detail: detail.to_string(),
        });
    }

    /// Record a meta-repo blob dropped in favor of a submodule root.
    pub fn record_path_override(&mut self, branch: &str, path: &str) {
        self.outcomes.push(Outcome::PathOverride {
            branch: branch.to_string(),
            path: path.to_string(),
        });
    }

    /// Stamp the completion time.
    pub fn finish(&mut self) {
        self.finished_at = Some(now_rfc3339());
    }

    pub fn repos(&self) -> &[RepoDiscovered] {
        &self.repos
    }

    pub fn resolutions(&self) -> &[BranchResolved] {
        &self.resolutions
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn whitelist(&self) -> Option<&WhitelistApplied> {
        self.whitelist.as_ref()
    }

    /// Count of branches that ended in `Failure`.
    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Outcome::Failure { .. }))
            .count()
    }

    /// Serialize to the stable JSON form.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the report to `path`, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Current time as RFC 3339 UTC, pinned by `SOURCE_DATE_EPOCH` when set.
fn now_rfc3339() -> String {
    let now = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))
        .unwrap_or_else(Utc::now);
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}
