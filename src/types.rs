//! Core version types

use crate::error::VersionError;
use crate::hasher;
use crate::path::relative_hash_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A file returned by a tree scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Backend-defined content digest
    pub hash: String,
}

/// Content digest of a unit's selected source files
///
/// `files` is always sorted ascending and `content_hash` depends only on the
/// set of `(relative path, file hash)` pairs, never on scan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeVersion {
    pub content_hash: String,
    pub files: Vec<PathBuf>,
}

impl TreeVersion {
    /// Build a tree version from scanned files in any order
    ///
    /// Paths are hashed relative to `root` so the digest doesn't depend on
    /// where the checkout lives.
    pub fn from_scan(root: &Path, mut scanned: Vec<ScannedFile>) -> Self {
        scanned.sort_by(|a, b| a.path.cmp(&b.path));
        scanned.dedup_by(|a, b| a.path == b.path);

        let tokens: Vec<(String, &str)> = scanned
            .iter()
            .map(|f| {
                let rel = relative_hash_path(root, &f.path)
                    .unwrap_or_else(|| f.path.to_string_lossy().replace('\\', "/"));
                (rel, f.hash.as_str())
            })
            .collect();
        let content_hash =
            hasher::compute_tree_hash(tokens.iter().map(|(p, h)| (p.as_str(), *h)));

        Self {
            content_hash,
            files: scanned.into_iter().map(|f| f.path).collect(),
        }
    }

    /// Tree version of a unit that selects no files
    pub fn empty() -> Self {
        Self {
            content_hash: hasher::NEW_UNIT_VERSION.to_string(),
            files: Vec::new(),
        }
    }

    /// Check the sorted-files invariant
    pub fn verify(&self) -> Result<(), VersionError> {
        if self.files.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VersionError::InvariantViolation(
                "tree version files are not strictly sorted".to_string(),
            ));
        }
        if self.files.is_empty() != (self.content_hash == hasher::NEW_UNIT_VERSION) {
            return Err(VersionError::InvariantViolation(format!(
                "content hash {} does not match file count {}",
                self.content_hash,
                self.files.len()
            )));
        }
        Ok(())
    }
}

/// A tree version tagged with its unit name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedTreeVersion {
    pub name: String,
    #[serde(flatten)]
    pub tree: TreeVersion,
}

/// The composed version of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleVersion {
    /// The unit's own tree digest, not including dependencies
    pub content_hash: String,
    /// Final identifier exposed to the rest of the system
    pub version_string: String,
    /// Dependency name -> dependency version string
    pub dependency_versions: BTreeMap<String, String>,
    pub files: Vec<PathBuf>,
}

/// A module version tagged with its unit name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedModuleVersion {
    pub name: String,
    #[serde(flatten)]
    pub version: ModuleVersion,
}

impl NamedModuleVersion {
    pub fn version_string(&self) -> &str {
        &self.version.version_string
    }
}
