//! Integration tests for tree version resolution over a real filesystem

use super::test_utils::{fs_session, write_file};
use stamp::error::{ScanError, VersionError};
use stamp::hasher::NEW_UNIT_VERSION;
use stamp::resolver::GetTreeVersionOptions;
use stamp::unit::UnitConfig;
use std::path::PathBuf;
use tempfile::TempDir;

/// Files are listed sorted and absolute; the config file never appears
#[tokio::test]
async fn test_tree_lists_sorted_files_without_config() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "api/src/main.rs", "fn main() {}");
    write_file(root, "api/README.md", "api");
    write_file(root, "api/stamp.toml", "kind = \"container\"");

    let session = fs_session(root);
    let mut unit = UnitConfig::new("api", "container", root.join("api"));
    unit.config_path = Some(root.join("api/stamp.toml"));

    let tree = session
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();

    assert_eq!(
        tree.files,
        vec![root.join("api/README.md"), root.join("api/src/main.rs")]
    );
    assert_ne!(tree.content_hash, NEW_UNIT_VERSION);
}

/// Editing the config file alone does not change the tree hash
#[tokio::test]
async fn test_config_file_edit_keeps_hash() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "api/main.rs", "fn main() {}");
    write_file(root, "api/stamp.toml", "a = 1");

    let mut unit = UnitConfig::new("api", "container", root.join("api"));
    unit.config_path = Some(root.join("api/stamp.toml"));

    let first = fs_session(root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    write_file(root, "api/stamp.toml", "a = 2");
    let second = fs_session(root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();

    assert_eq!(first.content_hash, second.content_hash);
}

/// Include and exclude rules select the documented subset
#[tokio::test]
async fn test_include_then_exclude() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "svc/src/lib.rs", "lib");
    write_file(root, "svc/src/gen/out.rs", "generated");
    write_file(root, "svc/docs/index.md", "docs");

    let mut unit = UnitConfig::new("svc", "exec", root.join("svc"));
    unit.include = Some(vec!["src".to_string()]);
    unit.exclude = Some(vec!["src/gen".to_string()]);

    let tree = fs_session(root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    assert_eq!(tree.files, vec![root.join("svc/src/lib.rs")]);
}

/// An explicit empty include list yields the empty tree without scanning
#[tokio::test]
async fn test_empty_include_is_empty_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "svc/file", "x");

    let mut unit = UnitConfig::new("svc", "exec", root.join("svc"));
    unit.include = Some(vec![]);

    let tree = fs_session(root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    assert!(tree.files.is_empty());
    assert_eq!(tree.content_hash, NEW_UNIT_VERSION);
}

/// A unit whose root doesn't exist fails instead of versioning as empty
#[tokio::test]
async fn test_missing_root_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let unit = UnitConfig::new("ghost", "exec", temp_dir.path().join("ghost"));

    let session = fs_session(temp_dir.path());
    let err = session
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VersionError::Scan(ScanError::RootNotFound(_))));
    assert!(session.cache().is_empty());
}

/// A source override scans the override directory, not the base path
#[tokio::test]
async fn test_source_override_outside_base() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "api/stamp.toml", "");
    write_file(root, "shared/lib.rs", "shared");

    let mut unit = UnitConfig::new("api", "container", root.join("api"));
    unit.source_override_path = Some(PathBuf::from("../shared"));

    let tree = fs_session(root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    assert_eq!(tree.files, vec![root.join("shared/lib.rs")]);
}

/// A project-root unit skips the default project excludes
#[tokio::test]
async fn test_project_root_unit_default_excludes() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "Makefile", "all:");
    write_file(root, ".stamp/config.toml", "scanner = \"fs\"");
    write_file(root, "debug-info-1/trace.log", "trace");

    let unit = UnitConfig::new("root", "exec", root);
    let tree = fs_session(root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    assert_eq!(tree.files, vec![root.join("Makefile")]);
}
