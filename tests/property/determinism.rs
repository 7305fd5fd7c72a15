//! Property-based tests for determinism guarantees

use proptest::prelude::*;
use stamp::compose::{canonical_json, compose_tree_digest_version};
use stamp::hasher;
use stamp::types::{ModuleVersion, NamedModuleVersion, ScannedFile, TreeVersion};
use stamp::unit::UnitConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

fn scanned(root: &Path, files: &[(String, String)]) -> Vec<ScannedFile> {
    files
        .iter()
        .map(|(name, hash)| ScannedFile {
            path: root.join(name),
            hash: hash.clone(),
        })
        .collect()
}

fn dependency(name: &str, version: &str) -> NamedModuleVersion {
    NamedModuleVersion {
        name: name.to_string(),
        version: ModuleVersion {
            content_hash: String::new(),
            version_string: version.to_string(),
            dependency_versions: BTreeMap::new(),
            files: vec![],
        },
    }
}

/// Distinct relative file names with arbitrary content hashes
fn file_set() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-z]{1,6}(/[a-z]{1,6}){0,2}", "[0-9a-f]{8}", 1..20)
        .prop_map(|m| m.into_iter().collect())
}

/// Scan order never affects the tree version
#[test]
fn test_tree_version_permutation_invariant() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(file_set(), any::<u64>()), |(files, seed)| {
            let root = Path::new("/project/unit");
            let mut shuffled = files.clone();
            // Deterministic rotation plus reversal stands in for a shuffle.
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            if seed % 2 == 0 {
                shuffled.reverse();
            }

            let a = TreeVersion::from_scan(root, scanned(root, &files));
            let b = TreeVersion::from_scan(root, scanned(root, &shuffled));
            prop_assert_eq!(&a, &b);
            prop_assert!(a.files.windows(2).all(|w| w[0] < w[1]));
            Ok(())
        })
        .unwrap();
}

/// The tree hash depends on relative paths only
#[test]
fn test_tree_hash_location_independent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&file_set(), |files| {
            let here = Path::new("/checkout/one/unit");
            let there = Path::new("/elsewhere/unit");
            let a = TreeVersion::from_scan(here, scanned(here, &files));
            let b = TreeVersion::from_scan(there, scanned(there, &files));
            prop_assert_eq!(a.content_hash, b.content_hash);
            Ok(())
        })
        .unwrap();
}

/// Dependency order never affects the composed version
#[test]
fn test_dependency_order_invariant() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::btree_set("[a-z]{1,8}", 0..8),
            |names: BTreeSet<String>| {
                let unit = UnitConfig::new("app", "container", "/project/app");
                let tree = TreeVersion {
                    content_hash: hasher::compute_content_hash(b"tree"),
                    files: vec![],
                };
                let deps: Vec<NamedModuleVersion> = names
                    .iter()
                    .map(|n| dependency(n, &format!("v-{}", n)))
                    .collect();
                let mut reversed = deps.clone();
                reversed.reverse();

                prop_assert_eq!(
                    compose_tree_digest_version(&unit, &tree, &deps),
                    compose_tree_digest_version(&unit, &tree, &reversed)
                );
                Ok(())
            },
        )
        .unwrap();
}

/// Canonical JSON ignores object key insertion order
#[test]
fn test_canonical_json_key_order_invariant() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::btree_map("[a-z]{1,5}", any::<i64>(), 0..10),
            |entries| {
                let forward: serde_json::Map<String, serde_json::Value> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(*v)))
                    .collect();
                let backward: serde_json::Map<String, serde_json::Value> = entries
                    .iter()
                    .rev()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(*v)))
                    .collect();

                prop_assert_eq!(
                    canonical_json(&serde_json::Value::Object(forward)),
                    canonical_json(&serde_json::Value::Object(backward))
                );
                Ok(())
            },
        )
        .unwrap();
}

/// Equal content always hashes equally
#[test]
fn test_content_hash_determinism() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<Vec<u8>>(), |content| {
            prop_assert_eq!(
                hasher::compute_content_hash(&content),
                hasher::compute_content_hash(&content.clone())
            );
            Ok(())
        })
        .unwrap();
}
