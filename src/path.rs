//! # Path Manipulation Utilities
//!
//! This module provides utility functions for working with monorepo target
//! subpaths and with on-disk names derived from repository identifiers.
//!
//! ## Key Functions
//!
//! - **`normalize_subpath`**: Validates and canonicalizes a `target_subpath`
//!   as recorded in a meta-repo's submodule configuration. Subpaths must stay
//!   inside the monorepo root, so absolute paths and `..` components are
//!   rejected; redundant `./` segments and trailing slashes are stripped.
//!   The monorepo root itself is spelled `.`.
//!
//! - **`is_under`**: Checks whether one normalized subpath is equal to or
//!   nested below another. Used when deciding whether a meta-repo blob is
//!   shadowed by a submodule root.
//!
//! - **`encode_repo_name`**: Converts a repository name into a string that is
//!   safe to use as a directory name under `sources/`, so names containing
//!   separators or shell-hostile characters cannot escape the workspace.

use crate::error::{Error, Result};

/// Validate and canonicalize a target subpath.
///
/// Accepts `.` (the monorepo root) and relative paths built from normal
/// components. Rejects empty input, absolute paths, `..` components, and
/// backslashes (submodule config paths are slash-separated on every
/// platform).
///
/// # Examples
///
/// ```
/// use monomaker::path::normalize_subpath;
///
/// assert_eq!(normalize_subpath(".").unwrap(), ".");
/// assert_eq!(normalize_subpath("libs/a/").unwrap(), "libs/a");
/// assert_eq!(normalize_subpath("./a").unwrap(), "a");
/// assert!(normalize_subpath("../escape").is_err());
/// assert!(normalize_subpath("/absolute").is_err());
/// ```
pub fn normalize_subpath(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(Error::Workspace {
            message: "empty target subpath".to_string(),
        });
    }
    if raw.contains('\\') {
        return Err(Error::Workspace {
            message: format!("backslash in target subpath: {raw}"),
        });
    }
    if raw.starts_with('/') {
        return Err(Error::Workspace {
            message: format!("absolute target subpath: {raw}"),
        });
    }

    let mut components = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                return Err(Error::Workspace {
                    message: format!("target subpath escapes the monorepo root: {raw}"),
                });
            }
            other => components.push(other),
        }
    }

    if components.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(components.join("/"))
    }
}

/// Check whether normalized subpath `path` equals `root` or lies below it.
///
/// `root = "."` contains every subpath.
///
/// # Examples
///
/// ```
/// use monomaker::path::is_under;
///
/// assert!(is_under("a/b", "a"));
/// assert!(is_under("a", "a"));
/// assert!(!is_under("ab", "a"));
/// assert!(is_under("anything", "."));
/// ```
pub fn is_under(path: &str, root: &str) -> bool {
    if root == "." {
        return true;
    }
    path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

/// Join an owner's target subpath with a path relative to that owner.
///
/// The owner root `.` yields the relative path unchanged.
pub fn join_subpath(owner: &str, relative: &str) -> String {
    if owner == "." {
        relative.to_string()
    } else {
        format!("{owner}/{relative}")
    }
}

/// Encode a repository name into a filesystem-safe directory name.
///
/// Separators and shell-hostile characters are replaced so that a submodule
/// named `libs/a` clones into `sources/libs-a` instead of a nested path.
///
/// # Examples
///
/// ```
/// use monomaker::path::encode_repo_name;
///
/// assert_eq!(encode_repo_name("libs/a"), "libs-a");
/// assert_eq!(encode_repo_name("plain-name_1.0"), "plain-name_1.0");
/// assert_eq!(encode_repo_name("odd:name?"), "odd_name_");
/// ```
pub fn encode_repo_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' => '-',
            '\\' => '-',
            // Keep alphanumeric, dots, dashes, underscores as-is
            c if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            // Replace other characters with underscores
            _ => '_',
        })
        .collect()
}
