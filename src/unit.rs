//! Unit descriptors
//!
//! A `UnitConfig` is the part of a module or action declaration that version
//! resolution needs. Which of its fields feed the version hash is decided in
//! one place, `VersioningProjection::from_unit`.

use crate::error::ConfigurationError;
use crate::path::{normalize_lexically, resolve_relative};
use crate::selector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A dependency declared for building a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDependency {
    /// Name of the unit depended on
    pub name: String,
    /// Files copied from the dependency's build output
    #[serde(default)]
    pub copy: Vec<CopySpec>,
}

impl BuildDependency {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            copy: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopySpec {
    pub source: String,
    #[serde(default)]
    pub target: Option<String>,
}

/// What version resolution needs to know about a module or action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Stable identifying name
    pub name: String,
    /// Unit kind, e.g. "container" or "exec"
    pub kind: String,
    /// Directory the unit is declared in (absolute)
    pub base_path: PathBuf,
    /// File the unit is declared in (absolute); never part of its tree
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    /// Alternate source root, resolved against `base_path`
    #[serde(default)]
    pub source_override_path: Option<PathBuf>,
    /// Kind-specific configuration payload
    #[serde(default)]
    pub spec: Value,
    #[serde(default)]
    pub build_dependencies: Vec<BuildDependency>,
    /// Build-only projection of the unit. When present, runtime declarations
    /// (services, tasks, tests) no longer affect the version.
    #[serde(default)]
    pub build_config: Option<Value>,
    #[serde(default)]
    pub services: Vec<Value>,
    #[serde(default)]
    pub tasks: Vec<Value>,
    #[serde(default)]
    pub tests: Vec<Value>,
    /// Free-form metadata, never version-relevant
    #[serde(default)]
    pub description: Option<String>,
}

impl UnitConfig {
    /// Minimal descriptor rooted at `base_path`
    pub fn new(name: impl Into<String>, kind: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            base_path: base_path.into(),
            config_path: None,
            include: None,
            exclude: None,
            source_override_path: None,
            spec: Value::Null,
            build_dependencies: Vec::new(),
            build_config: None,
            services: Vec::new(),
            tasks: Vec::new(),
            tests: Vec::new(),
            description: None,
        }
    }

    /// Root the unit's tree is scanned from
    ///
    /// The override path is joined against `base_path`, not the process
    /// working directory, and may point outside it.
    pub fn effective_root(&self) -> PathBuf {
        match &self.source_override_path {
            Some(override_path) => resolve_relative(&self.base_path, override_path),
            None => normalize_lexically(&self.base_path),
        }
    }

    /// Names of declared build dependencies, sorted and deduplicated
    pub fn dependency_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .build_dependencies
            .iter()
            .map(|d| d.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            kind: self.kind.clone(),
            name: self.name.clone(),
            root: self.effective_root(),
        }
    }

    /// Reject descriptors the resolver can't work with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::InvalidUnit {
                name: self.name.clone(),
                message: "name cannot be empty".to_string(),
            });
        }
        if self.kind.trim().is_empty() {
            return Err(ConfigurationError::InvalidUnit {
                name: self.name.clone(),
                message: "kind cannot be empty".to_string(),
            });
        }
        if !self.base_path.is_absolute() {
            return Err(ConfigurationError::NotAbsolute(self.base_path.clone()));
        }
        if let Some(config_path) = &self.config_path {
            if !config_path.is_absolute() {
                return Err(ConfigurationError::NotAbsolute(config_path.clone()));
            }
        }

        let include = self.include.iter().flatten();
        let exclude = self.exclude.iter().flatten();
        for pattern in include.chain(exclude) {
            selector::validate_pattern(pattern).map_err(|e| {
                ConfigurationError::InvalidSelector {
                    unit: self.name.clone(),
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}

/// Key a unit's tree version is cached under
///
/// Derived from values only, so two semantically equal descriptors always
/// produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: String,
    pub name: String,
    pub root: PathBuf,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}@{}", self.kind, self.name, self.root.display())
    }
}

/// The fields of a unit that determine its build identity
///
/// Paths are left out so the same unit versions identically wherever the
/// project is checked out. `description` is never included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersioningProjection {
    pub name: String,
    pub kind: String,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub build_dependencies: Vec<BuildDependency>,
    #[serde(flatten)]
    pub payload: VersionPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPayload {
    /// Only the declared build configuration counts
    BuildConfig(Value),
    /// No build configuration declared: the whole spec, including runtime
    /// declarations, counts
    Full {
        spec: Value,
        services: Vec<Value>,
        tasks: Vec<Value>,
        tests: Vec<Value>,
    },
}

impl VersioningProjection {
    pub fn from_unit(unit: &UnitConfig) -> Self {
        let mut build_dependencies = unit.build_dependencies.clone();
        build_dependencies.sort_by(|a, b| a.name.cmp(&b.name));

        let payload = match &unit.build_config {
            Some(build_config) => VersionPayload::BuildConfig(build_config.clone()),
            None => VersionPayload::Full {
                spec: unit.spec.clone(),
                services: unit.services.clone(),
                tasks: unit.tasks.clone(),
                tests: unit.tests.clone(),
            },
        };

        Self {
            name: unit.name.clone(),
            kind: unit.kind.clone(),
            include: unit.include.clone(),
            exclude: unit.exclude.clone(),
            build_dependencies,
            payload,
        }
    }
}
