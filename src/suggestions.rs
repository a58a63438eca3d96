//! # Error Suggestions
//!
//! Helper functions for generating error messages with hints. Errors
//! surfaced to the user should say what went wrong AND how to fix it.

use std::path::Path;

/// The meta-repo path given on the command line does not exist.
pub fn meta_repo_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Meta-repo path not found: {path}\n\n\
         hint: Pass the path of a checked-out meta-repository\n\
         hint: Relative paths are resolved against the current directory",
        path = path.display()
    )
}

/// The meta-repo path exists but is not a git repository.
pub fn not_a_repository(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Not a git repository: {path}\n\n\
         hint: The meta-repo must contain a .git directory\n\
         hint: Run 'git -C {path} status' to see what git thinks of it",
        path = path.display()
    )
}

/// The whitelist file could not be used.
pub fn invalid_whitelist(path: &Path, detail: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Cannot use branch whitelist {path}: {detail}\n\n\
         hint: The whitelist is a JSON array of branch names, e.g. [\"feat-x\"]\n\
         hint: Duplicates are allowed; every element must be a string",
        path = path.display(),
        detail = detail
    )
}

/// The workspace already holds content and the user declined to replace it.
pub fn workspace_not_empty(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Workspace already contains a previous run: {path}\n\n\
         hint: Pass --yes to delete and recreate it without prompting\n\
         hint: Or pass --workspace to choose a fresh directory",
        path = path.display()
    )
}
