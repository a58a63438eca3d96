//! # Monomaker Library
//!
//! This library converts a *meta-repository* — a repository whose tree is
//! primarily a set of submodule pointers — into a single monorepo whose
//! working tree contains the meta-repo's content and the content of each
//! first-layer submodule at its configured path, while preserving the
//! history of every branch that matters.
//!
//! ## Core Concepts
//!
//! - **VCS Driver (`git`)**: The only component that invokes the external
//!   `git` executable, exposing narrow typed operations and parsing only
//!   porcelain-style output.
//! - **Repository Model (`repository`)**: Immutable description of each
//!   participating repository, built during discovery.
//! - **Branch Resolver (`resolver`)**: Pure computation of the monorepo
//!   branch set and, per branch, the feature-or-default choice for every
//!   repository.
//! - **History Synthesizer (`phases::synthesis`)**: Materializes each
//!   resolved branch by grafting source histories together, reproducing
//!   the meta-repo's merge topology when it has one.
//! - **Migration Report (`report`)**: Append-only, JSON-serializable
//!   record of every observation and decision; the run's verifiable
//!   artifact.
//! - **Workspace (`workspace`)**: The on-disk area a run owns: source
//!   clones (scoped to the run), the produced monorepo, and the report.
//!
//! ## Execution Flow
//!
//! The main entry point is `phases::orchestrator::execute_convert`, which
//! executes the pipeline:
//!
//! 1. **Discovery**: Clone the meta-repo, read its submodule config, clone
//!    every first-layer submodule in parallel, and enumerate branches and
//!    nested submodules.
//! 2. **Resolution**: Compute the effective branch set (whitelist-aware;
//!    defaults always included) and a per-repo plan for each branch.
//! 3. **Synthesis**: Build each monorepo branch from the shared empty root
//!    commit, one at a time; failures are isolated per branch.
//! 4. **Report**: Written on every exit path once the workspace exists.

pub mod defaults;
pub mod error;
pub mod git;
pub mod output;
pub mod path;
pub mod phases;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod suggestions;
pub mod whitelist;
pub mod workspace;

/// Process exit codes, as documented for the CLI.
pub mod exit_codes {
    /// Every requested branch synthesized, report written.
    pub const SUCCESS: i32 = 0;
    /// Bad command-line usage: unknown flags, missing arguments, invalid
    /// whitelist, nonexistent meta-repo path.
    pub const USAGE: i32 = 2;
    /// Some branches failed; workspace retained for inspection.
    pub const PARTIAL: i32 = 3;
    /// Fatal: workspace unusable, meta-repo invalid, discovery failed.
    pub const FATAL: i32 = 4;
    /// An internal invariant was violated; this is a monomaker bug.
    pub const INVARIANT: i32 = 70;
    /// The run was cancelled by a signal.
    pub const CANCELLED: i32 = 130;
}

#[cfg(test)]
mod tests {
    use super::exit_codes;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            exit_codes::SUCCESS,
            exit_codes::USAGE,
            exit_codes::PARTIAL,
            exit_codes::FATAL,
            exit_codes::INVARIANT,
            exit_codes::CANCELLED,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in codes.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
