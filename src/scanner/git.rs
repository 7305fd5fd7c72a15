//! Git-aware backend built on the `ignore` crate's walker

use crate::error::ScanError;
use crate::ignore_rules;
use crate::scanner::{
    check_root, is_config_file, is_scannable_file, relative_str, scan_file, ScanOptions,
    TreeScanner,
};
use crate::selector::SelectorSet;
use crate::types::ScannedFile;
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Scanner that honors `.gitignore`, `.git/info/exclude` and the user's
/// global git excludes, in addition to an optional custom ignore file.
#[derive(Debug, Clone, Default)]
pub struct GitScanner {
    ignore_file: Option<String>,
}

impl GitScanner {
    pub fn new(ignore_file: Option<String>) -> Self {
        Self { ignore_file }
    }
}

#[async_trait]
impl TreeScanner for GitScanner {
    fn name(&self) -> &'static str {
        "git"
    }

    #[instrument(skip(self, options), fields(root = %root.display(), backend = "git"))]
    async fn list_files(
        &self,
        root: &Path,
        options: &ScanOptions,
    ) -> Result<Vec<ScannedFile>, ScanError> {
        if options.selects_nothing() {
            debug!("Empty include list, skipping scan");
            return Ok(Vec::new());
        }

        let root = root.to_path_buf();
        let options = options.clone();
        let ignore_file = self.ignore_file.clone();
        tokio::task::spawn_blocking(move || walk(&root, &options, ignore_file.as_deref()))
            .await
            .map_err(|e| ScanError::Task(e.to_string()))?
    }

    async fn repo_root(&self, path: &Path) -> Result<Option<PathBuf>, ScanError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || find_repo_root(&path))
            .await
            .map_err(|e| ScanError::Task(e.to_string()))
    }
}

/// Closest ancestor of `path` (inclusive) containing a `.git` entry
pub fn find_repo_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn walk(
    root: &Path,
    options: &ScanOptions,
    ignore_file: Option<&str>,
) -> Result<Vec<ScannedFile>, ScanError> {
    let start = Instant::now();
    check_root(root)?;

    let selectors = Arc::new(SelectorSet::new(
        options.include.as_deref(),
        &options.exclude,
    )?);

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .ignore(false)
        .parents(true)
        .git_ignore(true)
        .git_exclude(true)
        .git_global(true)
        .require_git(false)
        .follow_links(false);
    if let Some(name) = ignore_file {
        builder.add_custom_ignore_filename(name);
    }

    let prune_root = root.to_path_buf();
    let prune_selectors = Arc::clone(&selectors);
    builder.filter_entry(move |entry| {
        if entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if ignore_rules::is_builtin_ignored(&name) {
            return false;
        }
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        !is_dir || !prune_selectors.is_excluded(&relative_str(&prune_root, entry.path()))
    });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry.map_err(|e| ScanError::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| is_scannable_file(t, path)) {
            continue;
        }
        if is_config_file(path, options.config_file.as_deref()) {
            continue;
        }
        if !selectors.is_selected(&relative_str(root, path)) {
            continue;
        }
        files.push(scan_file(path.to_path_buf())?);
    }

    info!(
        file_count = files.len(),
        duration_ms = start.elapsed().as_millis(),
        "Git scan completed"
    );
    Ok(files)
}
