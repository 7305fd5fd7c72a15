//! Tree Cache
//!
//! In-memory store of computed tree versions, keyed by `CacheKey`. Each entry
//! carries the set of paths whose change invalidates it. Entries never expire
//! on their own; the cache lives as long as the session that owns it.

use crate::path::is_sub_path;
use crate::types::TreeVersion;
use crate::unit::CacheKey;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<TreeVersion>,
    dependent_paths: BTreeSet<PathBuf>,
}

impl CacheEntry {
    fn new(value: Arc<TreeVersion>, dependent_paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            value,
            dependent_paths: dependent_paths.into_iter().collect(),
        }
    }

    /// Whether a change at `changed` may affect this entry
    ///
    /// True when the change is inside a dependent path, or when it is an
    /// ancestor of one (a parent directory was renamed or removed).
    fn is_affected_by(&self, changed: &Path) -> bool {
        self.dependent_paths.iter().any(|dep| {
            is_sub_path(dep, changed).unwrap_or(false) || is_sub_path(changed, dep).unwrap_or(false)
        })
    }
}

/// Number of recent invalidations remembered for conditional inserts
const CHANGE_LOG_CAPACITY: usize = 1024;

/// What an invalidation touched
#[derive(Debug)]
enum Change {
    Paths(Vec<PathBuf>),
    Key(CacheKey),
    Everything,
}

/// Invalidation epoch plus the most recent changes, newest last
#[derive(Debug, Default)]
struct ChangeLog {
    epoch: u64,
    recent: VecDeque<(u64, Change)>,
}

impl ChangeLog {
    fn record(&mut self, change: Change) -> u64 {
        self.epoch += 1;
        self.recent.push_back((self.epoch, change));
        if self.recent.len() > CHANGE_LOG_CAPACITY {
            self.recent.pop_front();
        }
        self.epoch
    }

    /// Whether any change after `observed_epoch` affects `entry` stored under `key`
    ///
    /// Changes that fell out of the log count as affecting everything.
    fn affects_since(&self, observed_epoch: u64, key: &CacheKey, entry: &CacheEntry) -> bool {
        if observed_epoch >= self.epoch {
            return false;
        }
        match self.recent.front() {
            Some((oldest, _)) if *oldest <= observed_epoch + 1 => {}
            _ => return true,
        }
        self.recent
            .iter()
            .filter(|(epoch, _)| *epoch > observed_epoch)
            .any(|(_, change)| match change {
                Change::Paths(paths) => paths.iter().any(|p| entry.is_affected_by(p)),
                Change::Key(changed) => changed == key,
                Change::Everything => true,
            })
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub invalidations: u64,
}

/// Concurrent tree version cache
///
/// Backed by a sharded map, so lookups and inserts for different keys don't
/// contend. Each insert replaces the whole entry at once; readers see either
/// the old or the new value, never a mix.
#[derive(Debug, Default)]
pub struct TreeCache {
    entries: DashMap<CacheKey, CacheEntry>,
    /// Every invalidation bumps the epoch and is logged. Held for reading
    /// across inserts so an insert can't race past an invalidation.
    changes: RwLock<ChangeLog>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    invalidations: AtomicU64,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<TreeVersion>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Tree cache hit");
                Some(Arc::clone(&entry.value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Tree cache miss");
                None
            }
        }
    }

    /// Store a value unconditionally (last writer wins)
    pub fn set(
        &self,
        key: CacheKey,
        value: Arc<TreeVersion>,
        dependent_paths: impl IntoIterator<Item = PathBuf>,
    ) {
        let _changes = self.changes.read();
        self.insert(key, CacheEntry::new(value, dependent_paths));
    }

    /// Store a value only if nothing affecting it changed since `observed_epoch`
    ///
    /// Returns whether the value was stored. Used for results of scans that
    /// started at `observed_epoch`: if files under the entry's dependent paths
    /// changed while the scan ran, its result may already be stale. Changes
    /// elsewhere don't block the insert.
    pub fn set_if_current(
        &self,
        key: CacheKey,
        value: Arc<TreeVersion>,
        dependent_paths: impl IntoIterator<Item = PathBuf>,
        observed_epoch: u64,
    ) -> bool {
        let entry = CacheEntry::new(value, dependent_paths);
        let changes = self.changes.read();
        if changes.affects_since(observed_epoch, &key, &entry) {
            debug!(key = %key, "Cache invalidated during scan, not storing result");
            return false;
        }
        self.insert(key, entry);
        true
    }

    fn insert(&self, key: CacheKey, entry: CacheEntry) {
        trace!(key = %key, dependent_paths = entry.dependent_paths.len(), "Tree cache insert");
        self.entries.insert(key, entry);
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Current invalidation epoch
    pub fn epoch(&self) -> u64 {
        self.changes.read().epoch
    }

    /// Remove every entry affected by a change at any of `changed_paths`
    ///
    /// Returns the number of entries removed. Relative paths can't be matched
    /// against entries and are skipped.
    pub fn invalidate<I, P>(&self, changed_paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let changed: Vec<PathBuf> = changed_paths
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref();
                if p.is_absolute() {
                    Some(p.to_path_buf())
                } else {
                    warn!(path = %p.display(), "Ignoring relative path in cache invalidation");
                    None
                }
            })
            .collect();
        if changed.is_empty() {
            return 0;
        }

        let mut changes = self.changes.write();

        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !changed.iter().any(|c| entry.is_affected_by(c)));
        let removed = before.saturating_sub(self.entries.len());
        let changed_count = changed.len();
        let epoch = changes.record(Change::Paths(changed));

        self.invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
        debug!(
            changed = changed_count,
            removed,
            epoch,
            "Tree cache invalidated"
        );
        removed
    }

    /// Remove a single entry
    pub fn invalidate_key(&self, key: &CacheKey) -> bool {
        let mut changes = self.changes.write();
        changes.record(Change::Key(key.clone()));
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn clear(&self) {
        let mut changes = self.changes.write();
        changes.record(Change::Everything);
        let removed = self.entries.len();
        self.entries.clear();
        self.invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}
