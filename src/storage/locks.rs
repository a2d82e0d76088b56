//! Per-path lock table
//!
//! Serializes mutations of the same canonical path while leaving unrelated
//! paths fully concurrent. Entries are dropped from the table as soon as no
//! guard references them.

use dashmap::DashMap;
use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct PathLocks {
    table: DashMap<PathBuf, Arc<Mutex<()>>>,
}

/// Holds one path's lock until dropped.
pub struct PathGuard<'a> {
    locks: &'a PathLocks,
    key: PathBuf,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `path` is free, then hold it.
    pub fn lock(&self, path: &Path) -> PathGuard<'_> {
        // Clone out of the shard before blocking so the shard is not held.
        let mutex = self.table.entry(path.to_path_buf()).or_default().clone();
        PathGuard {
            locks: self,
            key: path.to_path_buf(),
            guard: Some(mutex.lock_arc()),
        }
    }

    /// Lock two paths in a fixed order; a single guard when they coincide.
    pub fn lock_pair(&self, a: &Path, b: &Path) -> Vec<PathGuard<'_>> {
        if a == b {
            return vec![self.lock(a)];
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first);
        let second = self.lock(second);
        vec![first, second]
    }

    /// Number of paths currently tracked.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
