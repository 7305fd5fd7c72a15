//! End-to-end version resolution over real directories

use super::test_utils::{fs_session, write_file};
use stamp::resolver::GetTreeVersionOptions;
use stamp::unit::{BuildDependency, UnitConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn unit_a(root: &Path) -> UnitConfig {
    let mut unit = UnitConfig::new("a", "container", root.join("a"));
    unit.include = Some(vec!["b".to_string(), "c".to_string(), "d".to_string()]);
    unit
}

fn unit_b(root: &Path) -> UnitConfig {
    let mut unit = UnitConfig::new("b", "container", root.join("b"));
    unit.build_dependencies = vec![BuildDependency::named("a")];
    unit
}

async fn version_of_b(root: &Path) -> String {
    let session = fs_session(root);
    let results = session.resolve_all(&[unit_b(root), unit_a(root)]).await;
    results["b"].as_ref().unwrap().version.version_string.clone()
}

/// Files come back sorted whatever order they were written in
#[tokio::test]
async fn test_files_sorted() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for name in ["d", "b", "c"] {
        write_file(root, &format!("a/{}", name), name);
    }

    let tree = fs_session(root)
        .tree_version(&unit_a(root), GetTreeVersionOptions::default())
        .await
        .unwrap();
    assert_eq!(
        tree.files,
        vec![root.join("a/b"), root.join("a/c"), root.join("a/d")]
    );
}

/// A dependent's version follows its dependency's content
#[tokio::test]
async fn test_dependent_version_tracks_dependency_content() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for name in ["b", "c", "d"] {
        write_file(root, &format!("a/{}", name), name);
    }
    write_file(root, "b/main.rs", "fn main() {}");

    let before = version_of_b(root).await;
    write_file(root, "a/c", "changed");
    let after = version_of_b(root).await;

    assert_ne!(before, after);
}

/// Changes outside the dependency's selection leave the dependent alone
#[tokio::test]
async fn test_dependent_version_ignores_unselected_siblings() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for name in ["b", "c", "d"] {
        write_file(root, &format!("a/{}", name), name);
    }
    write_file(root, "a/notes/todo.txt", "later");
    write_file(root, "b/main.rs", "fn main() {}");

    let before = version_of_b(root).await;
    write_file(root, "a/notes/todo.txt", "sooner");
    fs::rename(root.join("a/notes"), root.join("a/archive")).unwrap();
    let after = version_of_b(root).await;

    assert_eq!(before, after);
}

/// Renaming a selected file changes the tree hash even with equal content
#[tokio::test]
async fn test_rename_within_tree_changes_hash() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "svc/one.txt", "same");
    let unit = UnitConfig::new("svc", "exec", root.join("svc"));

    let before = fs_session(root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    fs::rename(root.join("svc/one.txt"), root.join("svc/two.txt")).unwrap();
    let after = fs_session(root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();

    assert_ne!(before.content_hash, after.content_hash);
}

/// The same project checked out in two places versions identically
#[tokio::test]
async fn test_version_independent_of_checkout_location() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    for root in [first.path(), second.path()] {
        for name in ["b", "c", "d"] {
            write_file(root, &format!("a/{}", name), name);
        }
        write_file(root, "b/main.rs", "fn main() {}");
    }

    assert_eq!(version_of_b(first.path()).await, version_of_b(second.path()).await);
}
