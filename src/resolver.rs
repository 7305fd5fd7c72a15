//! Tree Version Resolver
//!
//! Turns a unit descriptor into a `TreeVersion`, consulting the cache first and
//! scanning on a miss.

use crate::cache::TreeCache;
use crate::error::VersionError;
use crate::path::{is_same_location, normalize_lexically};
use crate::scanner::{ScanOptions, TreeScanner};
use crate::types::{NamedTreeVersion, TreeVersion};
use crate::unit::{CacheKey, UnitConfig};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Options for `get_tree_version`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetTreeVersionOptions {
    /// Ignore any cached entry and scan again
    pub force_rescan: bool,
}

/// Resolver settings that apply to every unit
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Root of the enclosing project
    pub project_root: PathBuf,
    /// Excludes applied to project-root units that declare no include rules
    pub project_excludes: Vec<String>,
}

/// Per-key scan locks
type KeyLocks = DashMap<CacheKey, Arc<Mutex<()>>>;

/// Resolves and caches tree versions
///
/// Holds no per-unit state besides the per-key locks that keep two scans of
/// the same unit from running at once. A lock lives only while some task
/// holds or waits on it.
pub struct TreeVersionResolver {
    scanner: Arc<dyn TreeScanner>,
    cache: Arc<TreeCache>,
    settings: ResolverSettings,
    key_locks: KeyLocks,
}

impl TreeVersionResolver {
    pub fn new(
        scanner: Arc<dyn TreeScanner>,
        cache: Arc<TreeCache>,
        settings: ResolverSettings,
    ) -> Self {
        let settings = ResolverSettings {
            project_root: normalize_lexically(&settings.project_root),
            ..settings
        };
        Self {
            scanner,
            cache,
            settings,
            key_locks: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<TreeCache> {
        &self.cache
    }

    pub fn scanner(&self) -> &Arc<dyn TreeScanner> {
        &self.scanner
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolve the tree version of a unit
    #[instrument(skip(self, unit, options), fields(unit = %unit.name, kind = %unit.kind))]
    pub async fn get_tree_version(
        &self,
        unit: &UnitConfig,
        options: GetTreeVersionOptions,
    ) -> Result<Arc<TreeVersion>, VersionError> {
        unit.validate()?;
        let key = unit.cache_key();

        if !options.force_rescan {
            if let Some(hit) = self.cache.get(&key) {
                debug!(key = %key, "Using cached tree version");
                return Ok(hit);
            }
        }

        // Declared before the lock so it drops after it, also on cancellation.
        let _release = KeyLockRelease {
            locks: &self.key_locks,
            key: &key,
        };
        let lock = self
            .key_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have finished scanning this unit while we waited.
        if !options.force_rescan {
            if let Some(hit) = self.cache.get(&key) {
                debug!(key = %key, "Tree version resolved by concurrent scan");
                return Ok(hit);
            }
        }

        let observed_epoch = self.cache.epoch();
        let root = unit.effective_root();
        let scan_options = self.scan_options(unit, &root);
        let start = Instant::now();

        let tree = if scan_options.selects_nothing() {
            TreeVersion::empty()
        } else {
            let files = self.scanner.list_files(&root, &scan_options).await?;
            TreeVersion::from_scan(&root, files)
        };
        tree.verify()?;
        let tree = Arc::new(tree);

        let stored = self.cache.set_if_current(
            key.clone(),
            Arc::clone(&tree),
            dependent_paths(unit, &root),
            observed_epoch,
        );

        info!(
            key = %key,
            backend = self.scanner.name(),
            file_count = tree.files.len(),
            content_hash = %tree.content_hash,
            cached = stored,
            duration_ms = start.elapsed().as_millis(),
            "Resolved tree version"
        );
        Ok(tree)
    }

    /// Resolve the tree version of a unit and tag it with the unit's name
    pub async fn get_named_tree_version(
        &self,
        unit: &UnitConfig,
        options: GetTreeVersionOptions,
    ) -> Result<NamedTreeVersion, VersionError> {
        let tree = self.get_tree_version(unit, options).await?;
        Ok(NamedTreeVersion {
            name: unit.name.clone(),
            tree: (*tree).clone(),
        })
    }

    /// Scan options for a unit rooted at `root`
    ///
    /// Project default excludes are decided on the effective root, after any
    /// source override has been applied.
    pub fn scan_options(&self, unit: &UnitConfig, root: &Path) -> ScanOptions {
        let mut exclude = unit.exclude.clone().unwrap_or_default();
        if unit.include.is_none() && is_same_location(root, &self.settings.project_root) {
            exclude.extend(self.settings.project_excludes.iter().cloned());
        }
        ScanOptions {
            include: unit.include.clone(),
            exclude,
            config_file: unit.config_path.clone(),
        }
    }
}

/// Drops a key's lock entry once no task holds or waits on it
struct KeyLockRelease<'a> {
    locks: &'a KeyLocks,
    key: &'a CacheKey,
}

impl Drop for KeyLockRelease<'_> {
    fn drop(&mut self) {
        self.locks
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Paths whose change must drop a unit's cached tree version
fn dependent_paths(unit: &UnitConfig, root: &Path) -> Vec<PathBuf> {
    let mut paths = vec![root.to_path_buf()];
    if unit.source_override_path.is_some() {
        let base = normalize_lexically(&unit.base_path);
        if base != root {
            // A change under the declared base can repoint the override.
            paths.push(base);
        }
    }
    paths
}
