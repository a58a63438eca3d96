//! Orchestrator for the complete conversion
//!
//! Sequences discovery, resolution, and per-branch synthesis, appends to
//! the migration report as it goes, and writes the report on every exit
//! path (success, per-branch failure, fatal error, cancellation).

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{info, warn};

use super::{discovery, synthesis, Cancellation};
use crate::error::{Error, Result};
use crate::git::GitDriver;
use crate::report::MigrationReport;
use crate::resolver;
use crate::workspace::Workspace;

/// Reason for skipping a whitelist entry that names no branch anywhere.
const UNKNOWN_BRANCH: &str = "unknown-branch";

/// Inputs of one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Path of the meta-repo to convert.
    pub meta_path: PathBuf,
    /// Worker pool size for parallel discovery.
    pub workers: usize,
    /// Optional branch whitelist; defaults are materialized regardless.
    pub whitelist: Option<BTreeSet<String>>,
    /// Force linear synthesis even when the meta branch has merges.
    pub flatten_merges: bool,
}

/// Per-run outcome counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub synthesized: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Run the full pipeline. `on_branch` is called before each branch with
/// `(index, total, branch)` so the caller can render progress.
pub fn execute_convert(
    driver: &GitDriver,
    workspace: &Workspace,
    options: &ConvertOptions,
    report: &mut MigrationReport,
    cancel: &Cancellation,
    on_branch: &mut dyn FnMut(usize, usize, &str),
) -> Result<RunSummary> {
    let result = convert_inner(driver, workspace, options, report, cancel, on_branch);

    report.finish();
    if let Err(write_error) = report.write_to(workspace.report_path()) {
        match &result {
            // A run that produced the monorepo but no report is not a
            // success; the report is the verifiable artifact.
            Ok(_) => return Err(write_error),
            Err(_) => warn!(
                "could not write report to {}: {}",
                workspace.report_path().display(),
                write_error
            ),
        }
    }
    result
}

fn convert_inner(
    driver: &GitDriver,
    workspace: &Workspace,
    options: &ConvertOptions,
    report: &mut MigrationReport,
    cancel: &Cancellation,
    on_branch: &mut dyn FnMut(usize, usize, &str),
) -> Result<RunSummary> {
    let repos = discovery::execute(
        driver,
        workspace,
        &options.meta_path,
        options.workers,
        report,
        cancel,
    )?;

    let resolution = resolver::resolve(&repos, options.whitelist.as_ref());
    let effective: Vec<String> = resolution
        .plans
        .iter()
        .map(|plan| plan.branch.clone())
        .collect();
    if let Some(requested) = &options.whitelist {
        report.record_whitelist(requested, &effective);
    }

    let mut summary = RunSummary::default();
    for unknown in &resolution.unknown {
        warn!("whitelist entry {unknown} names no branch in any repository");
        report.record_skip(unknown, UNKNOWN_BRANCH);
        summary.skipped += 1;
    }
    for plan in &resolution.plans {
        report.record_resolved(plan);
    }
    info!("resolved {} branch(es) to synthesize", resolution.plans.len());

    cancel.check()?;
    let monorepo = workspace.monorepo_dir();
    driver.init_monorepo(&monorepo)?;

    let synthesis_options = synthesis::SynthesisOptions {
        flatten_merges: options.flatten_merges,
    };
    let total = resolution.plans.len();
    for (index, plan) in resolution.plans.iter().enumerate() {
        cancel.check()?;
        resolver::verify_plan(plan, &repos)?;
        on_branch(index, total, &plan.branch);

        match synthesis::synthesize_branch(
            driver,
            &monorepo,
            &repos,
            plan,
            &synthesis_options,
            cancel,
        ) {
            Ok(outcome) => {
                for path in &outcome.overridden_paths {
                    report.record_path_override(&plan.branch, path);
                }
                report.record_synthesized(&plan.branch, &outcome.commit_sha);
                info!("synthesized {} at {}", plan.branch, outcome.commit_sha);
                summary.synthesized += 1;
            }
            Err(error @ (Error::Cancelled | Error::Invariant { .. })) => return Err(error),
            Err(error) => {
                warn!("branch {} failed: {}", plan.branch, error);
                synthesis::preserve_failed(driver, &monorepo, &plan.branch);
                report.record_failure(&plan.branch, &error.to_string());
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
