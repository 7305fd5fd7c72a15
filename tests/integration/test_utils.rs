//! Shared fixtures for integration tests

use stamp::resolver::ResolverSettings;
use stamp::scanner::{ScannerKind, WalkdirScanner};
use stamp::session::Session;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Write `content` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Session over a plain filesystem scanner rooted at `project_root`
pub fn fs_session(project_root: &Path) -> Session {
    Session::with_scanner(
        Arc::new(WalkdirScanner::default()),
        settings(project_root),
    )
}

/// Session over the given backend
pub fn session_for(kind: ScannerKind, project_root: &Path) -> Session {
    Session::with_scanner(stamp::create_scanner(kind, None), settings(project_root))
}

pub fn settings(project_root: &Path) -> ResolverSettings {
    ResolverSettings {
        project_root: project_root.to_path_buf(),
        project_excludes: stamp::ignore_rules::default_project_excludes(),
    }
}
