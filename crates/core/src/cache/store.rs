use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::table::CacheTable;
use crate::config::SETTINGS_DIR;
use crate::types::ParsedDocument;

pub const CACHE_FILE: &str = "python.cache";

/// Parse results for every cache root, persisted write-behind.
///
/// Updates only mark a root dirty. A flusher task writes dirty tables
/// out on a fixed tick, so a crash loses at most one interval of updates.
/// The cache is always re-derivable from the sources.
#[derive(Debug, Default)]
pub struct CacheStore {
    tables: Mutex<HashMap<PathBuf, ProjectCache>>,
}

#[derive(Debug)]
struct ProjectCache {
    table: CacheTable,
    dirty: bool,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_file(root: &Path) -> PathBuf {
        root.join(SETTINGS_DIR).join(CACHE_FILE)
    }

    fn with_cache<R>(&self, root: &Path, f: impl FnOnce(&mut ProjectCache) -> R) -> R {
        let mut tables = self.tables.lock();
        let cache = tables.entry(root.to_path_buf()).or_insert_with(|| {
            tracing::debug!("Loading parse cache for {}", root.display());
            ProjectCache {
                table: CacheTable::load(&Self::cache_file(root)),
                dirty: false,
            }
        });
        f(cache)
    }

    /// Cached document for `key` under `root`, if it was parsed at `mtime`
    pub fn lookup(&self, root: &Path, key: &str, mtime: u64) -> Option<ParsedDocument> {
        self.with_cache(root, |cache| cache.table.get(key, mtime).cloned())
    }

    pub fn store(&self, root: &Path, key: &str, mtime: u64, document: ParsedDocument) {
        self.with_cache(root, |cache| {
            cache.table.insert(key.to_string(), mtime, document);
            cache.dirty = true;
        });
        tracing::debug!("Cached {} under {}", key, root.display());
    }

    pub fn is_dirty(&self, root: &Path) -> bool {
        self.tables
            .lock()
            .get(root)
            .map(|cache| cache.dirty)
            .unwrap_or(false)
    }

    /// Snapshot and clear the dirty flag of the selected roots
    fn take_dirty(&self, only: Option<&Path>) -> Vec<(PathBuf, CacheTable)> {
        let mut tables = self.tables.lock();
        tables
            .iter_mut()
            .filter(|(root, cache)| cache.dirty && only.is_none_or(|only| only == root.as_path()))
            .map(|(root, cache)| {
                cache.dirty = false;
                (root.clone(), cache.table.clone())
            })
            .collect()
    }

    fn write_out(&self, dirty: Vec<(PathBuf, CacheTable)>) -> usize {
        let mut written = 0;
        for (root, table) in dirty {
            let path = Self::cache_file(&root);
            match table.save(&path) {
                Ok(()) => {
                    tracing::debug!("Synced parse cache for {}", root.display());
                    written += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to write {}: {}", path.display(), e);
                    if let Some(cache) = self.tables.lock().get_mut(&root) {
                        cache.dirty = true;
                    }
                }
            }
        }
        written
    }

    /// Write every dirty table to disk; returns how many were written
    pub fn flush_all(&self) -> usize {
        let dirty = self.take_dirty(None);
        self.write_out(dirty)
    }

    pub fn flush_root(&self, root: &Path) -> bool {
        let dirty = self.take_dirty(Some(root));
        self.write_out(dirty) > 0
    }

    /// Drop the in-memory table of a root (after flushing it)
    pub fn evict(&self, root: &Path) {
        self.flush_root(root);
        self.tables.lock().remove(root);
    }

    /// Start the write-behind loop on the current tokio runtime
    pub fn spawn_flusher(self: &Arc<Self>, interval: Duration) -> FlusherHandle {
        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                let written = store.flush_all();
                if written > 0 {
                    tracing::trace!("Flusher wrote {} cache file(s)", written);
                }
            }
        });
        FlusherHandle { handle }
    }
}

/// Handle to a running write-behind loop
#[derive(Debug)]
pub struct FlusherHandle {
    handle: JoinHandle<()>,
}

impl FlusherHandle {
    pub fn stop(self) {
        self.handle.abort();
    }
}
