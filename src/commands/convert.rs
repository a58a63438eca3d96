//! # Convert Command Implementation
//!
//! This module implements the conversion command, the purpose of the
//! `monomaker` tool. It orchestrates the full pipeline of discovering,
//! resolving, and synthesizing branches into a monorepo.
//!
//! ## Execution Flow
//!
//! 1. **Input validation**: the meta-repo path and whitelist are checked
//!    before anything is written to disk; failures here are usage errors.
//! 2. **Workspace setup**: an existing workspace is only replaced after an
//!    explicit confirmation (or `--yes`).
//! 3. **Pipeline**: discovery, resolution, and per-branch synthesis run
//!    through the library orchestrator, with a progress bar across
//!    branches when stderr is a terminal.
//! 4. **Exit code mapping**: success, partial success (some branches
//!    failed), fatal errors, invariant violations, and cancellation each
//!    map to their documented exit code; source clones are released unless
//!    `--keep-on-failure` applies.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use indicatif::ProgressBar;
use log::{error, info, warn};

use monomaker::defaults;
use monomaker::error::Error;
use monomaker::exit_codes;
use monomaker::git::GitDriver;
use monomaker::output::{emoji, OutputConfig};
use monomaker::phases::orchestrator::{self, ConvertOptions};
use monomaker::phases::Cancellation;
use monomaker::report::MigrationReport;
use monomaker::suggestions;
use monomaker::whitelist;
use monomaker::workspace::{dir_has_entries, Workspace};

/// Arguments for the conversion.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path of the meta-repository to convert.
    #[arg(value_name = "METAREPO_PATH", required_unless_present = "completions")]
    pub metarepo_path: Option<PathBuf>,

    /// Directory where source clones, the monorepo, and the report are
    /// placed.
    ///
    /// Defaults to ./monomaker-workspace. Can also be set with the
    /// MONOMAKER_WORKSPACE environment variable.
    #[arg(long, value_name = "DIR", env = "MONOMAKER_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Path to a JSON array of branch names to convert.
    ///
    /// Default branches are always converted, whitelist or not. Entries
    /// that name no branch anywhere are recorded as skipped.
    #[arg(long, value_name = "JSON")]
    pub branches_whitelist: Option<PathBuf>,

    /// Where to write the migration report.
    ///
    /// Defaults to <workspace>/report.json.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Number of parallel workers for submodule discovery.
    #[arg(long, value_name = "N", default_value_t = defaults::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Keep the source clones when the run exits non-zero.
    ///
    /// The monorepo and the report are always kept.
    #[arg(long)]
    pub keep_on_failure: bool,

    /// Ignore meta-repo merge topology and import every branch linearly.
    #[arg(long)]
    pub flatten_merges: bool,

    /// Answer yes to prompts (e.g. replacing an existing workspace).
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Execute the conversion. Returns the process exit code; `Err` is
/// reserved for unexpected environment problems.
pub fn execute(args: ConvertArgs, output: &OutputConfig, show_progress: bool) -> Result<i32> {
    let start_time = Instant::now();

    let Some(meta_path) = args.metarepo_path.clone() else {
        // Unreachable through clap (required_unless_present), kept as a
        // guard for programmatic construction.
        anyhow::bail!("no meta-repo path given");
    };

    // Input validation: nothing is written to disk past this block unless
    // every input checks out.
    if !meta_path.exists() {
        eprintln!("{}", suggestions::meta_repo_not_found(&meta_path));
        return Ok(exit_codes::USAGE);
    }
    if args.workers == 0 {
        eprintln!("--workers must be at least 1");
        return Ok(exit_codes::USAGE);
    }
    let driver = GitDriver::new();
    if !driver.is_repository(&meta_path) {
        eprintln!("{}", suggestions::not_a_repository(&meta_path));
        return Ok(exit_codes::FATAL);
    }
    let whitelist = match &args.branches_whitelist {
        Some(path) => match whitelist::load(path) {
            Ok(branches) => Some(branches),
            Err(e) => {
                eprintln!("{}", suggestions::invalid_whitelist(path, &e.to_string()));
                return Ok(exit_codes::USAGE);
            }
        },
        None => None,
    };

    // Workspace setup; an existing workspace is destroyed only on explicit
    // user request.
    let root = args
        .workspace
        .clone()
        .unwrap_or_else(defaults::default_workspace_root);
    match dir_has_entries(&root) {
        Ok(false) => {}
        Ok(true) => {
            if !confirm_replace(&root, args.yes) {
                eprintln!("{}", suggestions::workspace_not_empty(&root));
                return Ok(exit_codes::FATAL);
            }
            if let Err(e) = std::fs::remove_dir_all(&root) {
                error!("cannot remove previous workspace {}: {}", root.display(), e);
                return Ok(exit_codes::FATAL);
            }
            info!("removed previous workspace at {}", root.display());
        }
        Err(e) => {
            error!("{e}");
            return Ok(e.exit_code());
        }
    }
    let workspace = match Workspace::prepare(&root, args.report.as_deref()) {
        Ok(workspace) => workspace,
        Err(e) => {
            error!("{e}");
            return Ok(e.exit_code());
        }
    };
    let sources = workspace.sources_guard();

    let cancel = Cancellation::new();
    register_signal_handlers(&cancel);

    info!(
        "{} Converting {} into {}",
        emoji(output, "🔍", "[RUN]"),
        meta_path.display(),
        workspace.monorepo_dir().display()
    );

    let options = ConvertOptions {
        meta_path,
        workers: args.workers,
        whitelist,
        flatten_merges: args.flatten_merges,
    };
    let mut report = MigrationReport::new();

    let bar = if show_progress {
        ProgressBar::new(0)
    } else {
        ProgressBar::hidden()
    };
    let mut on_branch = |index: usize, total: usize, branch: &str| {
        if bar.length() == Some(0) {
            bar.set_length(total as u64);
        }
        bar.set_position(index as u64);
        bar.set_message(branch.to_string());
    };

    let result = orchestrator::execute_convert(
        &driver,
        &workspace,
        &options,
        &mut report,
        &cancel,
        &mut on_branch,
    );
    bar.finish_and_clear();

    let code = match result {
        Ok(summary) => {
            let duration = start_time.elapsed();
            info!(
                "{} Converted {} branch(es) in {:.2}s ({} skipped, {} failed)",
                emoji(output, "✅", "[OK]"),
                summary.synthesized,
                duration.as_secs_f64(),
                summary.skipped,
                summary.failed
            );
            info!("   Monorepo: {}", workspace.monorepo_dir().display());
            info!("   Report:   {}", workspace.report_path().display());
            if summary.failed > 0 {
                warn!(
                    "{} {} branch(es) failed; partial heads kept under refs/monomaker/failed/",
                    emoji(output, "⚠️", "[WARN]"),
                    summary.failed
                );
                exit_codes::PARTIAL
            } else {
                exit_codes::SUCCESS
            }
        }
        Err(Error::Cancelled) => {
            warn!(
                "{} Cancelled; workspace left at {}",
                emoji(output, "🛑", "[STOP]"),
                workspace.root().display()
            );
            exit_codes::CANCELLED
        }
        Err(e) => {
            error!("{} Conversion failed: {}", emoji(output, "❌", "[FAIL]"), e);
            e.exit_code()
        }
    };

    if code != exit_codes::SUCCESS && args.keep_on_failure {
        sources.keep();
    }
    Ok(code)
}

/// Whether the user agreed to replace an existing workspace.
fn confirm_replace(root: &std::path::Path, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    if !console::Term::stderr().features().is_attended() {
        return false;
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Workspace {} already exists. Delete and recreate it?",
            root.display()
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}

#[cfg(unix)]
fn register_signal_handlers(cancel: &Cancellation) {
    use signal_hook::consts::{SIGINT, SIGTERM};

    let flag = cancel.as_flag();
    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, std::sync::Arc::clone(&flag)) {
            warn!("could not register handler for signal {signal}: {e}");
        }
    }
}

#[cfg(not(unix))]
fn register_signal_handlers(_cancel: &Cancellation) {}
