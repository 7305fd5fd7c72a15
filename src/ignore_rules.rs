//! Ignore rules for tree scans.
//!
//! Two layers live here. Backend ignore rules are applied by every scan before
//! include/exclude: VCS metadata directories plus an optional per-root ignore
//! file written in gitignore syntax. Project default excludes are only added by
//! the resolver for units whose scan root is the project root and which declare
//! no include rules, so such a unit doesn't hash the whole project tree.

use crate::error::ScanError;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Directory names never descended into by the filesystem backend.
pub const BUILTIN_IGNORES: &[&str] = &[".git", ".hg", ".svn"];

/// Excludes added for project-root units without include rules.
pub const DEFAULT_PROJECT_EXCLUDES: &[&str] = &[".git", ".gitmodules", ".stamp", "debug-info*"];

/// Default project excludes as owned strings
pub fn default_project_excludes() -> Vec<String> {
    DEFAULT_PROJECT_EXCLUDES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

/// Whether a file or directory name is a built-in ignore
pub fn is_builtin_ignored(name: &str) -> bool {
    BUILTIN_IGNORES.contains(&name)
}

/// Build a gitignore-syntax matcher from the ignore file at `root`, if any.
///
/// Returns `Ok(None)` when no ignore file name is configured or the file does
/// not exist. A file that exists but can't be parsed fails the scan.
pub fn load_ignore_matcher(
    root: &Path,
    file_name: Option<&str>,
) -> Result<Option<Gitignore>, ScanError> {
    let Some(file_name) = file_name else {
        return Ok(None);
    };
    let ignore_path = root.join(file_name);
    if !ignore_path.is_file() {
        return Ok(None);
    }

    let mut builder = GitignoreBuilder::new(root);
    if let Some(err) = builder.add(&ignore_path) {
        return Err(ScanError::InvalidPattern {
            pattern: ignore_path.display().to_string(),
            message: err.to_string(),
        });
    }
    let matcher = builder.build().map_err(|e| ScanError::InvalidPattern {
        pattern: ignore_path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(matcher))
}
