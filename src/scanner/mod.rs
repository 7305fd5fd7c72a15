//! Tree scanning
//!
//! A scanner lists the files under a root together with a content hash,
//! honoring backend ignore rules first and then the unit's include/exclude
//! selectors. Backends are picked once at construction time; tests plug in
//! their own implementations of the same trait.

pub mod git;
pub mod walker;

pub use git::GitScanner;
pub use walker::WalkdirScanner;

use crate::error::ScanError;
use crate::hasher;
use crate::path::normalize_lexically;
use crate::types::ScannedFile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Options for a single scan
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Include rules. `None` selects everything, `Some(vec![])` selects nothing.
    pub include: Option<Vec<String>>,
    /// Exclude rules
    pub exclude: Vec<String>,
    /// The unit's own config file, never part of its tree
    pub config_file: Option<PathBuf>,
}

impl ScanOptions {
    /// True when the include rules explicitly select nothing
    pub fn selects_nothing(&self) -> bool {
        matches!(self.include.as_deref(), Some([]))
    }
}

/// Source-control backend capability
#[async_trait]
pub trait TreeScanner: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// List files with content hashes under `root`
    ///
    /// Must return an empty list without touching the filesystem when
    /// `options.include` is `Some(vec![])`, and must fail rather than return a
    /// partial list.
    async fn list_files(
        &self,
        root: &Path,
        options: &ScanOptions,
    ) -> Result<Vec<ScannedFile>, ScanError>;

    /// Root of the repository enclosing `path`, if the backend knows of one
    async fn repo_root(&self, path: &Path) -> Result<Option<PathBuf>, ScanError>;
}

/// Available scanner backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    /// Plain filesystem walk
    Fs,
    /// Filesystem walk honoring git ignore rules
    #[default]
    Git,
}

impl std::fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScannerKind::Fs => write!(f, "fs"),
            ScannerKind::Git => write!(f, "git"),
        }
    }
}

/// Construct the scanner for a backend kind
pub fn create_scanner(kind: ScannerKind, ignore_file: Option<String>) -> Arc<dyn TreeScanner> {
    match kind {
        ScannerKind::Fs => Arc::new(WalkdirScanner::new(ignore_file)),
        ScannerKind::Git => Arc::new(GitScanner::new(ignore_file)),
    }
}

/// Fail unless `root` is an existing directory
pub(crate) fn check_root(root: &Path) -> Result<(), ScanError> {
    let metadata = match std::fs::metadata(root) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanError::RootNotFound(root.to_path_buf()))
        }
        Err(e) => {
            return Err(ScanError::Walk {
                path: root.to_path_buf(),
                message: e.to_string(),
            })
        }
    };
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    // Readability check; a root we can't list must not produce an empty tree.
    std::fs::read_dir(root).map_err(|e| ScanError::Walk {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Whether `path` is the unit's own config file
pub(crate) fn is_config_file(path: &Path, config_file: Option<&Path>) -> bool {
    config_file.is_some_and(|cfg| normalize_lexically(path) == normalize_lexically(cfg))
}

/// Whether a walked entry is hashed as a file
///
/// Symlinks to files count and are hashed by their target's content. Links
/// to directories are not followed, and dangling links are skipped.
pub(crate) fn is_scannable_file(file_type: std::fs::FileType, path: &Path) -> bool {
    if file_type.is_file() {
        return true;
    }
    if !file_type.is_symlink() {
        return false;
    }
    match std::fs::metadata(path) {
        Ok(target) => target.is_file(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping dangling symlink");
            false
        }
    }
}

/// Hash one selected file
pub(crate) fn scan_file(path: PathBuf) -> Result<ScannedFile, ScanError> {
    let hash = hasher::hash_file(&path).map_err(|source| ScanError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(ScannedFile { path, hash })
}

/// `/`-separated path of `path` relative to `root`
pub(crate) fn relative_str(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
