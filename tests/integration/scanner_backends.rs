//! Both scanner backends against the same fixtures

use super::test_utils::{session_for, write_file};
use stamp::resolver::GetTreeVersionOptions;
use stamp::scanner::{create_scanner, ScanOptions, ScannerKind};
use stamp::unit::UnitConfig;
use tempfile::TempDir;

/// Without ignore files both backends agree
#[tokio::test]
async fn test_backends_agree_on_plain_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "svc/a.txt", "a");
    write_file(root, "svc/nested/b.txt", "b");
    write_file(root, "svc/.hidden", "h");
    let unit = UnitConfig::new("svc", "exec", root.join("svc"));

    let fs_tree = session_for(ScannerKind::Fs, root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    let git_tree = session_for(ScannerKind::Git, root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();

    assert_eq!(fs_tree.files.len(), 3);
    assert_eq!(fs_tree, git_tree);
}

/// The git backend honors .gitignore; the fs backend does not
#[tokio::test]
async fn test_gitignore_only_affects_git_backend() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_file(root, "svc/.gitignore", "*.log\n");
    write_file(root, "svc/app.rs", "app");
    write_file(root, "svc/debug.log", "noise");
    let unit = UnitConfig::new("svc", "exec", root.join("svc"));

    let git_tree = session_for(ScannerKind::Git, root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    assert!(!git_tree.files.contains(&root.join("svc/debug.log")));
    assert!(git_tree.files.contains(&root.join("svc/app.rs")));

    let fs_tree = session_for(ScannerKind::Fs, root)
        .tree_version(&unit, GetTreeVersionOptions::default())
        .await
        .unwrap();
    assert!(fs_tree.files.contains(&root.join("svc/debug.log")));
}

/// A custom ignore file is honored by both backends
#[tokio::test]
async fn test_custom_ignore_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("svc");
    write_file(&root, ".stampignore", "tmp/\n");
    write_file(&root, "keep.rs", "keep");
    write_file(&root, "tmp/scratch", "scratch");

    for kind in [ScannerKind::Fs, ScannerKind::Git] {
        let scanner = create_scanner(kind, Some(".stampignore".to_string()));
        let files = scanner
            .list_files(&root, &ScanOptions::default())
            .await
            .unwrap();
        let paths: Vec<_> = files.into_iter().map(|f| f.path).collect();
        assert!(paths.contains(&root.join("keep.rs")), "{}", kind);
        assert!(!paths.contains(&root.join("tmp/scratch")), "{}", kind);
    }
}

/// The git backend finds the enclosing repository root
#[tokio::test]
async fn test_repo_root() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join(".git")).unwrap();
    std::fs::create_dir_all(root.join("a/b")).unwrap();

    let scanner = create_scanner(ScannerKind::Git, None);
    assert_eq!(
        scanner.repo_root(&root.join("a/b")).await.unwrap(),
        Some(root.to_path_buf())
    );
}
