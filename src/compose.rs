//! Version composition
//!
//! Folds a unit's tree digest, its version-relevant configuration and its
//! dependencies' versions into one version string.
//!
//! version = "v-" || hash(config_json "." content_hash "." dep_1 "." dep_2 ...)[..10]
//!
//! where `config_json` is the canonical serialization of the unit's
//! `VersioningProjection` and each `dep_i` is `name_version`, sorted by name.

use crate::error::ConfigurationError;
use crate::hasher::{self, VERSION_PREFIX};
use crate::types::{ModuleVersion, NamedModuleVersion, TreeVersion};
use crate::unit::{UnitConfig, VersioningProjection};
use serde_json::Value;
use std::collections::BTreeMap;

/// Compose the version string of a unit
///
/// Independent of the order of `dependency_versions` and of key order in
/// any JSON payload of the unit.
pub fn compose_tree_digest_version(
    unit: &UnitConfig,
    tree: &TreeVersion,
    dependency_versions: &[NamedModuleVersion],
) -> String {
    let mut dependencies: Vec<&NamedModuleVersion> = dependency_versions.iter().collect();
    dependencies.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.version_string().cmp(b.version_string()))
    });

    let mut parts = Vec::with_capacity(dependencies.len() + 2);
    parts.push(canonical_config_string(unit));
    parts.push(tree.content_hash.clone());
    for dependency in dependencies {
        parts.push(format!("{}_{}", dependency.name, dependency.version_string()));
    }

    format!("{}{}", VERSION_PREFIX, hasher::hash_strings(&parts))
}

/// Compose the full module version of a unit
///
/// Only declared build dependencies are folded in; every one of them must be
/// present in `dependency_versions`.
pub fn compose_full_version(
    unit: &UnitConfig,
    tree: &TreeVersion,
    dependency_versions: &[NamedModuleVersion],
) -> Result<NamedModuleVersion, ConfigurationError> {
    let by_name: BTreeMap<&str, &NamedModuleVersion> = dependency_versions
        .iter()
        .map(|v| (v.name.as_str(), v))
        .collect();

    let mut declared = Vec::new();
    for name in unit.dependency_names() {
        let version = by_name.get(name.as_str()).ok_or_else(|| {
            ConfigurationError::MissingDependencyVersion {
                unit: unit.name.clone(),
                dependency: name.clone(),
            }
        })?;
        declared.push((*version).clone());
    }

    let version_string = compose_tree_digest_version(unit, tree, &declared);
    let dependency_versions = declared
        .into_iter()
        .map(|v| (v.name, v.version.version_string))
        .collect();

    Ok(NamedModuleVersion {
        name: unit.name.clone(),
        version: ModuleVersion {
            content_hash: tree.content_hash.clone(),
            version_string,
            dependency_versions,
            files: tree.files.clone(),
        },
    })
}

/// Canonical JSON of the unit's versioning projection
pub fn canonical_config_string(unit: &UnitConfig) -> String {
    // Serializing a plain struct of strings and JSON values can't fail.
    let value = serde_json::to_value(VersioningProjection::from_unit(unit)).unwrap_or(Value::Null);
    canonical_json(&value)
}

/// Serialize JSON with object keys sorted at every level
///
/// Doesn't rely on the iteration order of `serde_json::Map`, which depends on
/// crate features.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
