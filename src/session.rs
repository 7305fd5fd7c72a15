//! Resolution sessions
//!
//! A session owns one tree cache, one scanner and one resolver. It is created
//! when a resolution pass starts and dropped when it ends; nothing is shared
//! between sessions.

use crate::cache::{CacheStats, TreeCache};
use crate::compose;
use crate::config::StampConfig;
use crate::error::{ConfigurationError, VersionError};
use crate::resolver::{GetTreeVersionOptions, ResolverSettings, TreeVersionResolver};
use crate::scanner::{self, TreeScanner};
use crate::types::{NamedModuleVersion, TreeVersion};
use crate::unit::UnitConfig;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of resolving a batch of units, keyed by unit name
pub type BatchResult = BTreeMap<String, Result<NamedModuleVersion, VersionError>>;

pub struct Session {
    resolver: TreeVersionResolver,
}

impl Session {
    /// Start a session with the scanner backend selected in `config`
    pub fn from_config(config: &StampConfig) -> Self {
        let scanner = scanner::create_scanner(config.scanner, config.ignore_file.clone());
        Self::with_scanner(scanner, config.resolver_settings())
    }

    /// Start a session with an explicit scanner
    pub fn with_scanner(scanner: Arc<dyn TreeScanner>, settings: ResolverSettings) -> Self {
        info!(
            backend = scanner.name(),
            project_root = %settings.project_root.display(),
            "Starting resolution session"
        );
        let cache = Arc::new(TreeCache::new());
        Self {
            resolver: TreeVersionResolver::new(scanner, cache, settings),
        }
    }

    pub fn resolver(&self) -> &TreeVersionResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<TreeCache> {
        self.resolver.cache()
    }

    pub async fn tree_version(
        &self,
        unit: &UnitConfig,
        options: GetTreeVersionOptions,
    ) -> Result<Arc<TreeVersion>, VersionError> {
        self.resolver.get_tree_version(unit, options).await
    }

    /// Resolve a unit's full version given its dependencies' versions
    #[instrument(skip(self, unit, dependency_versions), fields(unit = %unit.name))]
    pub async fn module_version(
        &self,
        unit: &UnitConfig,
        dependency_versions: &[NamedModuleVersion],
    ) -> Result<NamedModuleVersion, VersionError> {
        let tree = self
            .resolver
            .get_tree_version(unit, GetTreeVersionOptions::default())
            .await?;
        let version = compose::compose_full_version(unit, &tree, dependency_versions)?;
        debug!(version = %version.version_string(), "Composed module version");
        Ok(version)
    }

    /// Version string of a unit given its dependencies' versions
    pub async fn module_version_string(
        &self,
        unit: &UnitConfig,
        dependency_versions: &[NamedModuleVersion],
    ) -> Result<String, VersionError> {
        let version = self.module_version(unit, dependency_versions).await?;
        Ok(version.version.version_string)
    }

    /// Resolve every unit in `units`, dependencies first
    ///
    /// Units whose dependencies are all resolved run concurrently. A failure
    /// only affects the failing unit and the units depending on it.
    #[instrument(skip(self, units), fields(units = units.len()))]
    pub async fn resolve_all(&self, units: &[UnitConfig]) -> BatchResult {
        let mut results: BatchResult = BTreeMap::new();
        let mut pending: BTreeMap<&str, &UnitConfig> = BTreeMap::new();

        for unit in units {
            if pending.insert(unit.name.as_str(), unit).is_some() {
                warn!(unit = %unit.name, "Duplicate unit name in batch");
                results.insert(
                    unit.name.clone(),
                    Err(ConfigurationError::InvalidUnit {
                        name: unit.name.clone(),
                        message: "declared more than once".to_string(),
                    }
                    .into()),
                );
            }
        }
        for name in results.keys() {
            pending.remove(name.as_str());
        }

        let mut wave = 0usize;
        while !pending.is_empty() {
            let ready: Vec<&UnitConfig> = pending
                .values()
                .filter(|unit| {
                    unit.dependency_names()
                        .iter()
                        .all(|dep| !pending.contains_key(dep.as_str()))
                })
                .copied()
                .collect();

            if ready.is_empty() {
                let cycle: Vec<String> = pending.keys().map(|n| n.to_string()).collect();
                warn!(units = ?cycle, "Dependency cycle, giving up on remaining units");
                for name in &cycle {
                    results.insert(
                        name.clone(),
                        Err(ConfigurationError::DependencyCycle(cycle.clone()).into()),
                    );
                }
                break;
            }

            wave += 1;
            debug!(wave, ready = ready.len(), "Resolving wave");
            for unit in &ready {
                pending.remove(unit.name.as_str());
            }

            let prepared: Vec<_> = ready
                .into_iter()
                .map(|unit| (unit, dependency_inputs(unit, &results)))
                .collect();
            let jobs = prepared.into_iter().map(|(unit, deps)| async move {
                let outcome = match deps {
                    Ok(deps) => self.module_version(unit, &deps).await,
                    Err(e) => Err(e),
                };
                (unit.name.clone(), outcome)
            });
            for (name, outcome) in join_all(jobs).await {
                if let Err(e) = &outcome {
                    warn!(unit = %name, error = %e, "Unit resolution failed");
                }
                results.insert(name, outcome);
            }
        }

        let failed = results.values().filter(|r| r.is_err()).count();
        info!(resolved = results.len() - failed, failed, waves = wave, "Batch resolution completed");
        results
    }

    /// Drop cached tree versions affected by changes at `changed_paths`
    pub fn invalidate<I, P>(&self, changed_paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.cache().invalidate(changed_paths)
    }

    /// End the session, returning final cache counters
    pub fn close(self) -> CacheStats {
        let stats = self.cache().stats();
        info!(
            entries = stats.entries,
            hits = stats.hits,
            misses = stats.misses,
            invalidations = stats.invalidations,
            "Resolution session closed"
        );
        stats
    }
}

/// Collect the resolved versions of a unit's declared dependencies
fn dependency_inputs(
    unit: &UnitConfig,
    results: &BatchResult,
) -> Result<Vec<NamedModuleVersion>, VersionError> {
    let mut deps = Vec::new();
    for name in unit.dependency_names() {
        match results.get(&name) {
            Some(Ok(version)) => deps.push(version.clone()),
            Some(Err(_)) => {
                return Err(VersionError::DependencyFailed {
                    unit: unit.name.clone(),
                    dependency: name,
                })
            }
            None => {
                return Err(ConfigurationError::MissingDependencyVersion {
                    unit: unit.name.clone(),
                    dependency: name,
                }
                .into())
            }
        }
    }
    Ok(deps)
}
