//! Configuration-driven sessions

use super::test_utils::write_file;
use stamp::config::{ConfigLoader, StampConfig};
use stamp::scanner::ScannerKind;
use stamp::session::Session;
use stamp::unit::UnitConfig;
use tempfile::TempDir;

/// A session built from a config file uses the configured backend and excludes
#[tokio::test]
async fn test_session_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp_dir.path()).unwrap();
    write_file(
        &root,
        "stamp.toml",
        "scanner = \"fs\"\nproject_excludes = [\"build\", \"stamp.toml\"]\n",
    );
    write_file(&root, "src/main.rs", "fn main() {}");
    write_file(&root, "build/out.bin", "binary");

    let config = ConfigLoader::load_from_file(&root.join("stamp.toml")).unwrap();
    assert_eq!(config.scanner, ScannerKind::Fs);
    assert!(config.validate().is_ok());

    let session = Session::from_config(&config);
    assert_eq!(session.resolver().scanner().name(), "fs");

    let unit = UnitConfig::new("root", "exec", &root);
    let version = session.module_version(&unit, &[]).await.unwrap();
    assert_eq!(version.version.files, vec![root.join("src/main.rs")]);
}

/// Defaults validate once anchored at an absolute root
#[test]
fn test_default_config_round_trips_through_json() {
    let config = StampConfig {
        project_root: std::env::temp_dir(),
        ..StampConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let parsed: StampConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
    assert!(parsed.validate().is_ok());
}

/// A project opened through a symlink still gets its default excludes
#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_project_keeps_default_excludes() {
    let temp_dir = TempDir::new().unwrap();
    let real = temp_dir.path().join("real");
    let link = temp_dir.path().join("link");
    write_file(&real, ".stamp/config.toml", "scanner = \"fs\"\n");
    write_file(&real, "main.rs", "fn main() {}");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let config = ConfigLoader::load(&link).unwrap();
    assert_eq!(config.scanner, ScannerKind::Fs);
    let session = Session::from_config(&config);

    let unit = UnitConfig::new("root", "exec", &link);
    let version = session.module_version(&unit, &[]).await.unwrap();
    assert_eq!(version.version.files, vec![link.join("main.rs")]);
}

/// Units spelled through a symlink match a canonical project root
#[cfg(unix)]
#[tokio::test]
async fn test_unit_through_symlink_matches_canonical_project_root() {
    let temp_dir = TempDir::new().unwrap();
    let real = dunce::canonicalize(temp_dir.path()).unwrap().join("real");
    let link = temp_dir.path().join("link");
    write_file(&real, ".stamp/config.toml", "scanner = \"fs\"\n");
    write_file(&real, "main.rs", "fn main() {}");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let session = super::test_utils::fs_session(&real);
    let unit = UnitConfig::new("root", "exec", &link);
    let version = session.module_version(&unit, &[]).await.unwrap();
    assert_eq!(version.version.files, vec![link.join("main.rs")]);
}
