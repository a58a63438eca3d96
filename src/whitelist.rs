//! # Branch Whitelist Loading
//!
//! The whitelist file is a JSON array of branch names. Duplicates are
//! allowed and collapse silently; any non-string element is a usage error,
//! as is a name that could not be a git branch. Entries that name no branch
//! in any participating repository are *not* rejected here — the resolver
//! records them as skipped so the user learns about typos from the report.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};

/// Characters git forbids in ref names, plus whitespace.
const NAME_PATTERN: &str = r"^[^\s~^:?*\[\\]+$";

/// Load and validate a whitelist file.
pub fn load(path: &Path) -> Result<BTreeSet<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::BadWhitelist {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;
    parse(&content)
}

/// Parse whitelist JSON into a deduplicated set of branch names.
pub fn parse(content: &str) -> Result<BTreeSet<String>> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| Error::BadWhitelist {
            message: format!("invalid JSON: {e}"),
        })?;

    let entries = value.as_array().ok_or_else(|| Error::BadWhitelist {
        message: "expected a JSON array of branch names".to_string(),
    })?;

    let mut branches = BTreeSet::new();
    for entry in entries {
        let name = entry.as_str().ok_or_else(|| Error::BadWhitelist {
            message: format!("expected a string, found {entry}"),
        })?;
        validate_branch_name(name)?;
        branches.insert(name.to_string());
    }
    Ok(branches)
}

/// Reject names git itself would refuse as branch names.
fn validate_branch_name(name: &str) -> Result<()> {
    let pattern = Regex::new(NAME_PATTERN).expect("whitelist name pattern is valid");
    let well_formed = !name.is_empty()
        && pattern.is_match(name)
        && !name.contains("..")
        && !name.starts_with('-')
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.ends_with(".lock")
        && name != "@";
    if well_formed {
        Ok(())
    } else {
        Err(Error::BadWhitelist {
            message: format!("not a valid branch name: {name:?}"),
        })
    }
}
