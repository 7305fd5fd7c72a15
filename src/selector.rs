//! Include/exclude selector rules
//!
//! Rules are glob patterns relative to the scan root. A rule matches a path if
//! it matches the path itself or any of its ancestor directories, so
//! `node_modules` covers everything below `node_modules/` and `src` covers the
//! whole `src` tree. `*` does not cross `/`; use `**` for that.

use crate::error::ScanError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled include and exclude rules
#[derive(Debug, Clone)]
pub struct SelectorSet {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl SelectorSet {
    /// Compile selector rules
    ///
    /// `include: None` selects everything; `Some(&[])` selects nothing.
    pub fn new(include: Option<&[String]>, exclude: &[String]) -> Result<Self, ScanError> {
        let include = match include {
            Some(patterns) => Some(build_glob_set(patterns)?),
            None => None,
        };
        let exclude = build_glob_set(exclude)?;
        Ok(Self { include, exclude })
    }

    /// Whether a `/`-separated relative file path is selected
    pub fn is_selected(&self, relative: &str) -> bool {
        let included = match &self.include {
            Some(set) => matches_self_or_ancestor(set, relative),
            None => true,
        };
        included && !self.is_excluded(relative)
    }

    /// Whether a relative path (file or directory) is covered by an exclude rule
    ///
    /// Walkers use this to prune excluded directories without descending.
    pub fn is_excluded(&self, relative: &str) -> bool {
        matches_self_or_ancestor(&self.exclude, relative)
    }
}

/// Check a single pattern for validity without building a set
pub fn validate_pattern(pattern: &str) -> Result<(), ScanError> {
    compile(pattern).map(|_| ())
}

fn compile(pattern: &str) -> Result<globset::Glob, ScanError> {
    GlobBuilder::new(pattern.trim_end_matches('/'))
        .literal_separator(true)
        .build()
        .map_err(|e| ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile(pattern)?);
    }
    builder.build().map_err(|e| ScanError::InvalidPattern {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}

fn matches_self_or_ancestor(set: &GlobSet, relative: &str) -> bool {
    if set.is_empty() {
        return false;
    }
    if set.is_match(relative) {
        return true;
    }
    relative
        .match_indices('/')
        .any(|(idx, _)| set.is_match(&relative[..idx]))
}
