//! Filesystem backend built on walkdir

use crate::error::ScanError;
use crate::ignore_rules;
use crate::scanner::{
    check_root, is_config_file, is_scannable_file, relative_str, scan_file, ScanOptions,
    TreeScanner,
};
use crate::selector::SelectorSet;
use crate::types::ScannedFile;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Plain filesystem scanner
///
/// Ignores VCS metadata directories and, when configured, the patterns of an
/// ignore file at the scan root. Symlinks are never followed.
#[derive(Debug, Clone, Default)]
pub struct WalkdirScanner {
    ignore_file: Option<String>,
}

impl WalkdirScanner {
    pub fn new(ignore_file: Option<String>) -> Self {
        Self { ignore_file }
    }
}

#[async_trait]
impl TreeScanner for WalkdirScanner {
    fn name(&self) -> &'static str {
        "fs"
    }

    #[instrument(skip(self, options), fields(root = %root.display(), backend = "fs"))]
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

    async fn repo_root(&self, _path: &Path) -> Result<Option<PathBuf>, ScanError> {
        Ok(None)
    }
}

fn walk(
    root: &Path,
    options: &ScanOptions,
    ignore_file: Option<&str>,
) -> Result<Vec<ScannedFile>, ScanError> {
    let start = Instant::now();
    check_root(root)?;

    let selectors = SelectorSet::new(options.include.as_deref(), &options.exclude)?;
    let matcher = ignore_rules::load_ignore_matcher(root, ignore_file)?;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if ignore_rules::is_builtin_ignored(&name) {
                return false;
            }
            if !entry.file_type().is_dir() {
                return true;
            }
            if let Some(matcher) = &matcher {
                if matcher.matched(entry.path(), true).is_ignore() {
                    return false;
                }
            }
            !selectors.is_excluded(&relative_str(root, entry.path()))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| ScanError::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !is_scannable_file(entry.file_type(), path) {
            continue;
        }
        if is_config_file(path, options.config_file.as_deref()) {
            continue;
        }
        if let Some(matcher) = &matcher {
            if matcher.matched(path, false).is_ignore() {
                continue;
            }
        }
        if !selectors.is_selected(&relative_str(root, path)) {
            continue;
        }
        files.push(scan_file(path.to_path_buf())?);
    }

    info!(
        file_count = files.len(),
        duration_ms = start.elapsed().as_millis(),
        "Filesystem scan completed"
    );
    Ok(files)
}
