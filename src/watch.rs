//! Cache invalidation from filesystem events
//!
//! Watches a directory tree and drops affected tree versions from a
//! `TreeCache` as files change. Events are batched over a short window so a
//! burst of writes costs one invalidation pass.

use crate::cache::TreeCache;
use crate::error::WatchError;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Watch configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory to watch recursively
    pub root: PathBuf,
    /// Events arriving within this window are applied together
    pub batch_window_ms: u64,
}

impl WatchConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            batch_window_ms: 50,
        }
    }
}

/// Filesystem change event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

impl ChangeEvent {
    /// Paths whose cached trees this change can affect
    ///
    /// A rename touches both its source and its destination.
    pub fn affected_paths(&self) -> Vec<&Path> {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) | ChangeEvent::Removed(p) => {
                vec![p.as_path()]
            }
            ChangeEvent::Renamed { from, to } => vec![from.as_path(), to.as_path()],
        }
    }
}

/// Convert a notify event into change events
pub fn convert_event(event: &Event) -> Vec<ChangeEvent> {
    match &event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(ChangeEvent::Created).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
            (_, [from, to]) => vec![ChangeEvent::Renamed {
                from: from.clone(),
                to: to.clone(),
            }],
            (RenameMode::From, [path]) => vec![ChangeEvent::Removed(path.clone())],
            (RenameMode::To, [path]) => vec![ChangeEvent::Created(path.clone())],
            (_, paths) => paths.iter().cloned().map(ChangeEvent::Modified).collect(),
        },
        EventKind::Modify(_) => event.paths.iter().cloned().map(ChangeEvent::Modified).collect(),
        EventKind::Remove(_) => event.paths.iter().cloned().map(ChangeEvent::Removed).collect(),
        _ => Vec::new(),
    }
}

/// Invalidate cache entries affected by `events`
///
/// Returns the number of entries removed.
pub fn apply_events(cache: &TreeCache, events: &[ChangeEvent]) -> usize {
    let paths: BTreeSet<&Path> = events.iter().flat_map(|e| e.affected_paths()).collect();
    if paths.is_empty() {
        return 0;
    }
    let removed = cache.invalidate(paths);
    debug!(events = events.len(), removed, "Applied filesystem changes to tree cache");
    removed
}

/// Background watcher feeding filesystem changes into a `TreeCache`
///
/// Runs until `stop` is called or the value is dropped.
pub struct CacheWatcher {
    running: Arc<AtomicBool>,
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl CacheWatcher {
    /// Start watching `config.root`
    pub fn start(cache: Arc<TreeCache>, config: WatchConfig) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            if let Err(e) = tx.send(res) {
                error!("Error sending watch event: {}", e);
            }
        })
        .map_err(|e| WatchError::Init(e.to_string()))?;

        watcher
            .watch(&config.root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watch {
                path: config.root.clone(),
                message: e.to_string(),
            })?;
        info!(root = %config.root.display(), "Watching for changes");

        let running = Arc::new(AtomicBool::new(true));
        let worker = {
            let running = Arc::clone(&running);
            let batch_window = Duration::from_millis(config.batch_window_ms);
            std::thread::spawn(move || event_loop(&cache, &rx, &running, batch_window))
        };

        Ok(Self {
            running,
            watcher: Some(watcher),
            worker: Some(worker),
        })
    }

    /// Stop watching, applying any events still pending
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the watcher closes the channel and wakes the worker.
        self.watcher.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Cache watcher thread panicked");
            }
        }
    }
}

impl Drop for CacheWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn event_loop(
    cache: &TreeCache,
    rx: &mpsc::Receiver<notify::Result<Event>>,
    running: &AtomicBool,
    batch_window: Duration,
) {
    let mut pending: Vec<ChangeEvent> = Vec::new();
    let mut last_flush = Instant::now();

    while running.load(Ordering::SeqCst) {
        let timeout = batch_window.saturating_sub(last_flush.elapsed());
        match rx.recv_timeout(timeout.max(Duration::from_millis(1))) {
            Ok(Ok(event)) => pending.extend(convert_event(&event)),
            Ok(Err(e)) => warn!("Watch error: {}", e),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if last_flush.elapsed() >= batch_window {
            if !pending.is_empty() {
                apply_events(cache, &pending);
                pending.clear();
            }
            last_flush = Instant::now();
        }
    }

    // Drain whatever arrived before shutdown.
    pending.extend(rx.try_iter().filter_map(Result::ok).flat_map(|e| convert_event(&e)));
    if !pending.is_empty() {
        apply_events(cache, &pending);
    }
    debug!("Cache watcher stopped");
}
